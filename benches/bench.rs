#![feature(test)]
extern crate test;
use synth::text::{escape_html, EscapingWriter};
use synth::{django, ssi, tmpl, Context, Value};
use std::io::Write;
use test::bench::{black_box, Bencher};

const LOREM: &str = "Lorem ipsum dolor sit amet, consectetur adipisicing elit, \
                     sed do eiusmod tempor incididunt ut labore et dolore magna \
                     aliqua. Ut enim ad minim veniam, quis nostrud exercitation \
                     ullamco laboris nisi ut aliquip ex ea commodo consequat.\n \
                     Duis aute irure dolor in reprehenderit <in> voluptate velit \
                     esse cillum dolore eu fugiat nulla pariatur. Excepteur sint \
                     occaecat cupidatat non proident, sunt in culpa qui officia \
                     deserunt mollit anim id est laborum.\n";

fn people() -> Context {
    let people = (0..20)
        .map(|i| {
            Value::mapping([
                ("name".to_string(), Value::from(format!("Person <{i}>"))),
                ("age".to_string(), Value::from(20 + i)),
            ])
        })
        .collect::<Vec<_>>();
    Context::new().with("people", people).with("title", "People")
}

#[bench]
fn escaped_no_op(b: &mut Bencher) {
    b.iter(|| black_box(escape_html(black_box("Hello World!!"))));
}

#[bench]
fn escaped_short(b: &mut Bencher) {
    b.iter(|| black_box(escape_html(black_box("Hello <World>"))));
}

#[bench]
fn escaped_long(b: &mut Bencher) {
    b.iter(|| black_box(escape_html(black_box(LOREM))));
}

#[bench]
fn escaping_writer(b: &mut Bencher) {
    let mut buf = Vec::with_capacity(1000);
    b.iter(|| {
        buf.clear();
        black_box(write!(EscapingWriter(&mut buf), "{LOREM}")).unwrap();
    });
}

/// Raw write of the same text, for comparision.
#[bench]
fn escaped_long_baseline(b: &mut Bencher) {
    let mut buf = Vec::with_capacity(1000);
    b.iter(|| {
        buf.clear();
        black_box(write!(&mut buf, "{LOREM}")).unwrap();
    });
}

#[bench]
fn django_parse(b: &mut Bencher) {
    let source = "<h1>{{ title|upper }}</h1>\
                  {% for p in people %}{% cycle 'odd' 'even' %}: \
                  {{ p.name }} ({{ p.age|add:1 }}){% if not forloop.last %}, {% endif %}\
                  {% endfor %}";
    b.iter(|| black_box(django::Template::new(source)).unwrap());
}

#[bench]
fn django_render(b: &mut Bencher) {
    let template = django::Template::new(
        "<h1>{{ title|upper }}</h1>\
         {% for p in people %}{% cycle 'odd' 'even' %}: \
         {{ p.name }} ({{ p.age|add:1 }}){% if not forloop.last %}, {% endif %}\
         {% endfor %}",
    )
    .unwrap();
    let context = people();
    let options = django::Options::default();
    let mut buf = Vec::with_capacity(2000);
    b.iter(|| {
        buf.clear();
        black_box(template.render(&mut buf, &context, &options)).unwrap();
    });
}

#[bench]
fn ssi_render(b: &mut Bencher) {
    let template = ssi::Template::new(
        "<!--#set var='greeting' value='Hello ${title}' -->\
         <!--#if expr='$greeting = /^Hello/' --><!--#echo var='greeting' -->\
         <!--#else -->nope<!--#endif -->",
    )
    .unwrap();
    let context = people();
    let options = ssi::Options::default();
    let mut buf = Vec::with_capacity(2000);
    b.iter(|| {
        buf.clear();
        black_box(template.render(&mut buf, &context, &options)).unwrap();
    });
}

#[bench]
fn tmpl_render(b: &mut Bencher) {
    let template = tmpl::Template::new(
        "<h1><TMPL_VAR title></h1>\
         <TMPL_LOOP people><TMPL_VAR name ESCAPE=html> (<TMPL_VAR age>)\
         <TMPL_UNLESS __last__>, </TMPL_UNLESS></TMPL_LOOP>",
    )
    .unwrap();
    let context = people();
    let options = tmpl::Options::default();
    let mut buf = Vec::with_capacity(2000);
    b.iter(|| {
        buf.clear();
        black_box(template.render(&mut buf, &context, &options)).unwrap();
    });
}
