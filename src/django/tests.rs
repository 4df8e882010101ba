use super::{Arguments, Env, Library, Options, PatternResolver, Template};
use crate::{Context, Error, Result, Value};
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use pretty_assertions::assert_eq;
use std::fs;
use std::io::Write;
use std::sync::Arc;

fn datetime(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .and_then(|date| date.and_hms_opt(h, min, s))
        .unwrap()
}

fn mapping(pairs: &[(&str, &str)]) -> Value {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), Value::from(*v)))
        .collect()
}

fn kitchen_sink() -> Context {
    let past = datetime(2002, 1, 10, 1, 2, 3);
    let friends = vec![
        mapping(&[("name", "joe"), ("age", "23")]),
        mapping(&[("name", "bob"), ("age", "55")]),
        mapping(&[("name", "lou"), ("age", "41")]),
    ];
    let cities = [
        ("Mumbai", "19,000,000", "India"),
        ("Calcutta", "15,000,000", "India"),
        ("New York", "20,000,000", "USA"),
        ("Chicago", "7,000,000", "USA"),
        ("Tokyo", "33,000,000", "Japan"),
    ]
    .iter()
    .map(|&(name, population, country)| {
        mapping(&[("name", name), ("population", population), ("country", country)])
    })
    .collect::<Vec<_>>();
    let places = Value::from(vec![
        Value::from("Parent"),
        Value::from(vec![
            Value::from("States"),
            Value::from(vec![
                Value::from("Kansas"),
                Value::from(vec!["Lawrence", "Topeka"]),
                Value::from("Illinois1"),
                Value::from("Illinois2"),
            ]),
        ]),
    ]);
    Context::new()
        .with("foo", "A")
        .with("bar", "B")
        .with("qux", "C")
        .with("true_var", true)
        .with("false_var", false)
        .with("friends", friends)
        .with("past", past)
        .with("before_past", past - TimeDelta::hours(36))
        .with("after_past", past + TimeDelta::hours(1200) + TimeDelta::minutes(20))
        .with("future", datetime(2202, 2, 11, 3, 2, 1))
        .with("cities", cities)
        .with("places", places)
        .with("csrf_token", "ABCDEF123456")
        .with("xml_var", "<foo><bar><qux /></bar></foo>")
        .with("numbers", (1..=9).collect::<Vec<i32>>())
}

fn render_with(source: &str, context: &Context, options: &Options) -> Result<String> {
    Template::new(source)?.render_to_string_with(context, options)
}

fn render(source: &str) -> String {
    render_with(source, &kitchen_sink(), &Options::default()).unwrap()
}

fn render_empty(source: &str) -> String {
    render_with(source, &Context::new(), &Options::default()).unwrap()
}

/// Check each `(template, expected)` against the kitchen sink.
fn check(cases: &[(&str, &str)]) {
    for (source, expected) in cases {
        assert_eq!(render(source), *expected, "rendering {source:?}");
    }
}

/// Options looking for templates in a fresh directory holding `files`.
fn with_files(files: &[(&str, &str)]) -> (tempfile::TempDir, Options) {
    let dir = tempfile::tempdir().unwrap();
    for (name, content) in files {
        fs::write(dir.path().join(name), content).unwrap();
    }
    let options = Options {
        directories: vec![dir.path().to_path_buf()],
        ..Options::default()
    };
    (dir, options)
}

#[test]
fn sanity() {
    let html = "<foo>\nA foo <bar /> element.\n</foo>";
    for source in ["", "ABC", html] {
        assert_eq!(render_empty(source), source);
        assert_eq!(render(source), source);
    }
}

#[test]
fn literals() {
    check(&[
        ("{{True}}", "True"),
        ("{{False}}", "False"),
        ("{{0}}", "0"),
        ("{{42}}", "42"),
        ("{{-42}}", "-42"),
        ("{{0.0}}", "0"),
        ("{{-0.0}}", "-0"),
        ("{{3.3}}", "3.3"),
        ("{{3.30}}", "3.3"),
        ("{{03.3}}", "3.3"),
        ("{{03.30}}", "3.3"),
        ("{{'Foo'}}", "Foo"),
        ("{{\"Bar\"}}", "Bar"),
    ]);
}

#[test]
fn variables() {
    let source = "{{ foo }} {{ bar }} {{ qux }}";
    assert_eq!(render_empty(source), "  ");
    assert_eq!(render(source), "A B C");
}

#[test]
fn missing_tag() {
    let result = render_with("{% xyz 42 %}", &kitchen_sink(), &Options::default());
    assert!(matches!(result, Err(Error::MissingTag(name)) if name == "xyz"));
}

#[test]
fn missing_filter() {
    let result = render_with("{{ 42 | xyz }}", &kitchen_sink(), &Options::default());
    assert!(matches!(result, Err(Error::MissingFilter(name)) if name == "xyz"));
}

#[test]
fn autoescape_tag() {
    check(&[
        (
            "{% autoescape on %}{{ xml_var }}{% endautoescape %}",
            "&lt;foo&gt;&lt;bar&gt;&lt;qux /&gt;&lt;/bar&gt;&lt;/foo&gt;",
        ),
        (
            "{% autoescape off %}{{ xml_var }}{% endautoescape %}",
            "<foo><bar><qux /></bar></foo>",
        ),
        (
            "{% autoescape on %}{{ xml_var | safe }}{% endautoescape %}",
            "<foo><bar><qux /></bar></foo>",
        ),
    ]);
}

#[test]
fn comment_tag() {
    check(&[
        ("0{# Foo Bar Qux #}1", "01"),
        ("0{##}1", "01"),
        ("0{# {# #}1", "01"),
        ("0{# {{ x | y:'z' }} #}1", "01"),
        ("0{% comment %} Foo\n Bar\n Qux\n {% endcomment %}1", "01"),
    ]);
}

#[test]
fn csrf_token_tag() {
    assert_eq!(render_empty("{% csrf_token %}"), "");
    assert_eq!(
        render("{% csrf_token %}"),
        "<div style='display:none'><input type='hidden' name='csrfmiddlewaretoken' \
         value='ABCDEF123456' /></div>",
    );
    let context = Context::new().with("csrf_token", "NOTPROVIDED");
    assert_eq!(
        render_with("{% csrf_token %}", &context, &Options::default()).unwrap(),
        "",
    );
}

#[test]
fn cycle_tag() {
    check(&[
        ("{% for n in numbers %}{% cycle 'a' 'b' %}{% endfor %}", "ababababa"),
        (
            "{% for n in numbers|slice:':3' %}{% cycle 'x' 'y' as v silent %}[{{ v }}]{% endfor %}",
            "[x][y][x]",
        ),
        (
            "{% for n in numbers|slice:':2' %}{% cycle foo bar as v %}{{ v|lower }}{% endfor %}",
            "AaBb",
        ),
    ]);
}

#[test]
fn cycles_are_per_tag() {
    check(&[(
        "{% for n in numbers|slice:':2' %}{% cycle 1 2 %}{% cycle 3 4 %}{% endfor %}",
        "1324",
    )]);
}

#[test]
fn debug_tag() {
    assert_eq!(render("{% debug %}"), "");
    let options = Options {
        debug: true,
        ..Options::default()
    };
    let context = Context::new().with("foo", "<A>");
    let out = render_with("{% debug %}", &context, &options).unwrap();
    assert_eq!(out, "<h1>Context:</h1>\n    foo = &lt;A&gt;<br />\n");
}

#[test]
fn filter_tag() {
    check(&[
        ("{% filter escape %}<foo />{% endfilter %}", "<foo />"),
        ("{% filter force_escape %}<foo />{% endfilter %}", "&lt;foo /&gt;"),
        ("{% filter title | lower %}aBcD{% endfilter %}", "abcd"),
        ("{% filter upper | lower | title %}aBcD{% endfilter %}", "Abcd"),
        (
            "{% filter upper %}\n    <p>\n        <a href=\"foo/\">Foo</a>\n    </p>\n{% endfilter %}\n",
            "\n    <P>\n        <A HREF=\"FOO/\">FOO</A>\n    </P>\n\n",
        ),
    ]);
}

#[test]
fn firstof_tag() {
    check(&[
        ("{% firstof true_var %}", "True"),
        ("{% firstof true_var 'FALLBACK' %}", "True"),
        ("{% firstof true_var false_var 'FALLBACK' %}", "True"),
        ("{% firstof false_var true_var 'FALLBACK' %}", "True"),
        ("{% firstof false_var %}", ""),
        ("{% firstof false_var 'FALLBACK' %}", "FALLBACK"),
        ("{% firstof nonextant false_var numbers cities %}", "1, 2, 3, 4, 5, 6, 7, 8, 9"),
        ("{% firstof nonextant %}", ""),
    ]);
}

#[test]
fn for_tag() {
    check(&[
        (
            "{% for v in friends %}[{{ v }}]{% endfor %}",
            "[age: 23, name: joe][age: 55, name: bob][age: 41, name: lou]",
        ),
        (
            "{% for v in friends %}[{{ v }}]{% empty %}Bad{% endfor %}",
            "[age: 23, name: joe][age: 55, name: bob][age: 41, name: lou]",
        ),
        (
            "{% for v in '' %}Bad{% empty %} It's empty, Jim {% endfor %}",
            " It's empty, Jim ",
        ),
        ("{% for v in '' %}Bad{% endfor %}", ""),
        (
            "{% for n in numbers reversed %}{{ n }}{% endfor %}",
            "987654321",
        ),
    ]);
}

#[test]
fn for_tag_loop_variables() {
    check(&[
        (
            "{% for f in friends %}{{ forloop.counter }}{{ forloop.counter0 }}\
             {{ forloop.revcounter }}{{ forloop.revcounter0 }} {% endfor %}",
            "1032 2121 3210 ",
        ),
        (
            "{% for f in friends %}{% if forloop.first %}<{% endif %}{{ f.name }}\
             {% if forloop.last %}>{% endif %}{% endfor %}",
            "<joeboblou>",
        ),
        (
            "{% for a in numbers|slice:':2' %}{% for b in numbers|slice:':2' %}\
             {{ forloop.parentloop.counter }}{{ forloop.counter }} {% endfor %}{% endfor %}",
            "11 12 21 22 ",
        ),
    ]);
}

#[test]
fn for_tag_unpacks() {
    let context = Context::new().with(
        "pairs",
        vec![Value::from(vec!["a", "1"]), Value::from(vec!["b", "2"])],
    );
    let out = render_with(
        "{% for k, v in pairs %}{{ k }}={{ v }};{% endfor %}",
        &context,
        &Options::default(),
    )
    .unwrap();
    assert_eq!(out, "a=1;b=2;");
}

#[test]
fn if_tag() {
    check(&[
        ("{% if True %}Good{% endif %}{% if False %}Bad{% endif %}", "Good"),
        ("{% if True %}Good{% else %}Bad{% endif %}", "Good"),
        ("{% if False %}Bad{% else %}Good{% endif %}", "Good"),
        ("{% if 1 %}Good{% endif %}{% if False %}Bad{% endif %}", "Good"),
        ("{% if 1 %}Good{% else %}Bad{% endif %}", "Good"),
        ("{% if 0 %}Bad{% else %}Good{% endif %}", "Good"),
        ("{% if 0 %}Bad{% elif foo %}Good{% else %}Bad{% endif %}", "Good"),
        ("{% if not false_var and true_var %}Good{% endif %}", "Good"),
        ("{% if 1 and 0 or 1 %}Y{% endif %}", "Y"),
        ("{% if 1 or 0 and 0 %}Bad{% else %}Good{% endif %}", "Good"),
    ]);
}

#[test]
fn ifchanged_tag() {
    check(&[
        (
            "{% for c in '11223' %}{% ifchanged %}{{ c }}{% endifchanged %}{% endfor %}",
            "123",
        ),
        (
            "{% for c in '112' %}{% ifchanged c %}{{ c }}{% else %}.{% endifchanged %}{% endfor %}",
            "1.2",
        ),
    ]);
}

#[test]
fn ifequal_tag() {
    check(&[
        ("{% ifequal 6 6 %}Good{% endifequal %}", "Good"),
        ("{% ifequal 5 6 %}Good{% endifequal %}", ""),
        ("{% ifequal 6 6 %}Good{% else %}Bad{% endifequal %}", "Good"),
        ("{% ifequal 5 6 %}Bad{% else %}Good{% endifequal %}", "Good"),
        ("{% ifnotequal 5 6 %}Good{% else %}Bad{% endifnotequal %}", "Good"),
    ]);
}

#[test]
fn include_tag() {
    let (_dir, options) = with_files(&[
        ("empty.tpl", ""),
        ("variables.tpl", "foo: {{ foo }}\nbar: {{ bar }}\nqux: {{ qux }}\n"),
    ]);
    let context = kitchen_sink();
    let render = |source| render_with(source, &context, &options).unwrap();
    assert_eq!(render("{% include 'empty.tpl' %}"), "");
    assert_eq!(
        render("{% include 'variables.tpl' %}"),
        "foo: A\nbar: B\nqux: C\n",
    );
    assert_eq!(
        render("{% include 'variables.tpl' with foo='X' %}"),
        "foo: X\nbar: B\nqux: C\n",
    );
    assert_eq!(
        render("{% include 'variables.tpl' with foo='X' only %}"),
        "foo: X\nbar: \nqux: \n",
    );
}

#[test]
fn include_missing_file() {
    let (_dir, options) = with_files(&[]);
    let result = render_with("{% include 'nope.tpl' %}", &kitchen_sink(), &options);
    assert!(result.is_err());
}

#[test]
fn extends_tag() {
    let (_dir, options) = with_files(&[
        ("base.tpl", "<{% block a %}P{% endblock %}|{% block b %}Q{% endblock %}>"),
        (
            "middle.tpl",
            "{% extends 'base.tpl' %}{% block a %}M{{ block.super }}{% endblock %}",
        ),
    ]);
    let context = kitchen_sink();
    let render = |source| render_with(source, &context, &options).unwrap();
    assert_eq!(render("{% extends 'base.tpl' %}"), "<P|Q>");
    assert_eq!(
        render("{% extends 'base.tpl' %}{% block b %}{{ foo }}{% endblock %}"),
        "<P|A>",
    );
    assert_eq!(
        render("{% extends 'base.tpl' %}{% block a %}C-{{ block.super }}{% endblock %}"),
        "<C-P|Q>",
    );
    assert_eq!(
        render("{% extends 'middle.tpl' %}{% block a %}C{{ block.super }}{% endblock %}"),
        "<CMP|Q>",
    );
    assert_eq!(
        render("{% extends 'middle.tpl' %}{% block b %}{{ block.super }}!{% endblock %}"),
        "<MP|Q!>",
    );
}

#[test]
fn block_tag() {
    check(&[(
        "{% block a_block %}This is a block{% endblock a_block %}",
        "This is a block",
    )]);
    let result = render_with("{{ block.super }}", &kitchen_sink(), &Options::default());
    assert!(result.is_err());
}

fn greetings() -> Library {
    Library::new()
        .tag("hello", |out: &mut dyn Write, _: &Env, args: &Arguments| {
            let who = args.positional.first().cloned().unwrap_or_else(|| "world".into());
            write!(out, "Hello, {who}!")?;
            Ok(())
        })
        .filter("double", |_: &Env, value: Value, _: &[Value]| {
            Ok(Value::from(format!("{value}{value}")))
        })
}

#[test]
fn load_tag() {
    let mut options = Options::default();
    options.libraries.insert("greetings".to_string(), greetings());
    let context = kitchen_sink();
    let render = |source| render_with(source, &context, &options);
    assert_eq!(
        render("{% load greetings %}{% hello %} {% hello foo %} {{ 'ab'|double }}").unwrap(),
        "Hello, world! Hello, A! abab",
    );
    assert_eq!(
        render("{% load hello from greetings %}{% hello 'you' %}").unwrap(),
        "Hello, you!",
    );
    assert!(matches!(
        render("{% load hello from greetings %}{{ 'x'|double }}"),
        Err(Error::MissingFilter(_)),
    ));
    assert!(matches!(
        render("{% hello %}{% load greetings %}"),
        Err(Error::MissingTag(_)),
    ));
    assert!(matches!(
        render("{% load farewells %}"),
        Err(Error::MissingLibrary(name)) if name == "farewells"
    ));
}

#[test]
fn loaders_provide_libraries() {
    struct Greeter;
    impl super::Loader for Greeter {
        fn load(&self, name: &str) -> Option<Library> {
            (name == "greetings").then(greetings)
        }
    }
    let options = Options {
        loaders: vec![Arc::new(Greeter)],
        ..Options::default()
    };
    let out = render_with("{% load greetings %}{% hello %}", &Context::new(), &options).unwrap();
    assert_eq!(out, "Hello, world!");
}

#[test]
fn library_filter_replaces_builtin() {
    let mut options = Options::default();
    options.libraries.insert(
        "shout".to_string(),
        Library::new().filter("upper", |_: &Env, value: Value, _: &[Value]| {
            Ok(Value::from(format!("{}!", value.to_text()?.to_uppercase())))
        }),
    );
    let out = render_with("{% load shout %}{{ foo|upper }}", &kitchen_sink(), &options).unwrap();
    assert_eq!(out, "A!");
}

#[test]
fn now_tag() {
    let year = chrono::Local::now().format("%Y").to_string();
    assert_eq!(render("{% now 'Y' %}"), year);
}

#[test]
fn regroup_tag() {
    let source = "{% regroup cities by country as country_list %}\n\
                  \n\
                  <ul>\n\
                  {% for country in country_list %}\n    \
                  <li>{{ country.grouper }}\n    \
                  <ul>\n        \
                  {% for item in country.list %}\n          \
                  <li>{{ item.name }}: {{ item.population }}</li>\n        \
                  {% endfor %}\n    \
                  </ul>\n    \
                  </li>\n\
                  {% endfor %}\n\
                  </ul>\n";
    let group = |country: &str, cities: &[(&str, &str)]| {
        let mut out = format!("\n    <li>{country}\n    <ul>\n        \n");
        for (name, population) in cities {
            out.push_str(&format!("          <li>{name}: {population}</li>\n        \n"));
        }
        out.push_str("    </ul>\n    </li>\n");
        out
    };
    let expected = format!(
        "\n\n<ul>\n{}{}{}\n</ul>\n",
        group("India", &[("Mumbai", "19,000,000"), ("Calcutta", "15,000,000")]),
        group("USA", &[("New York", "20,000,000"), ("Chicago", "7,000,000")]),
        group("Japan", &[("Tokyo", "33,000,000")]),
    );
    assert_eq!(render(source), expected);
}

#[test]
fn regroup_missing_sequence() {
    check(&[(
        "{% regroup nonextant by country as groups %}[{% for g in groups %}x{% endfor %}]",
        "[]",
    )]);
}

#[test]
fn spaceless_tag() {
    check(&[
        (
            "{% spaceless %}\n    <p>\n        <a href=\"foo/\">Foo</a>\n    </p>\n{% endspaceless %}\n",
            "\n    <p><a href=\"foo/\">Foo</a></p>\n\n",
        ),
        (
            "{% spaceless %}\n    <strong>\n        Hello\n    </strong>\n{% endspaceless %}\n",
            "\n    <strong>\n        Hello\n    </strong>\n\n",
        ),
    ]);
}

#[test]
fn ssi_tag() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("included.txt");
    fs::write(&path, "x{{ foo }}\ny").unwrap();
    let path = path.display();
    assert_eq!(render(&format!("{{% ssi {path} %}}")), "x{{ foo }}\ny\n");
    assert_eq!(render(&format!("{{% ssi '{path}' parsed %}}")), "xA\ny");

    let result = render_with("{% ssi relative.txt %}", &kitchen_sink(), &Options::default());
    assert!(matches!(result, Err(Error::Logic(_))));
}

#[test]
fn templatetag_tag() {
    check(&[
        ("{% templatetag openbrace %}", "{"),
        ("{% templatetag closevariable %}", "}}"),
        ("{% templatetag openblock %}x{% templatetag closeblock %}", "{%x%}"),
        ("{% templatetag opencomment %}{% templatetag closecomment %}", "{##}"),
    ]);
}

fn resolving() -> Options {
    Options {
        resolvers: vec![Arc::new(
            PatternResolver::new().pattern("foo.bar.qux", "/foo-bar-qux"),
        )],
        ..Options::default()
    }
}

#[test]
fn url_tag() {
    let options = resolving();
    let context = kitchen_sink();
    let render = |source| render_with(source, &context, &options);
    assert_eq!(
        render("{% url 'foo.bar.qux' 1 2 3 %}").unwrap(),
        "/foo-bar-qux/1/2/3",
    );
    assert!(matches!(
        render("{% url 'x.y.z' 1 2 3 %}"),
        Err(Error::UnresolvedUrl(view)) if view == "x.y.z"
    ));
    assert_eq!(
        render("{% url 'foo.bar.qux' 1 2 3 as foo %}_{{ foo }}").unwrap(),
        "_/foo-bar-qux/1/2/3",
    );
    assert_eq!(
        render("{% url 'x.y.z' 1 2 3 as foo %}_{{ x }}").unwrap(),
        "_",
    );
}

#[test]
fn verbatim_tag() {
    check(&[(
        "{% verbatim %}{% for v in friends %}\n    <p>{{ v }}</p>\n{% endfor %}{% endverbatim %}\n",
        "{% for v in friends %}\n    <p>{{ v }}</p>\n{% endfor %}\n",
    )]);
}

#[test]
fn widthratio_tag() {
    check(&[
        ("{% widthratio 175 200 100 %}", "88"),
        ("{% widthratio 50 100 100 %}", "50"),
        ("{% widthratio 5 0 100 %}", "0"),
    ]);
}

#[test]
fn with_tag() {
    check(&[
        (
            "[{{ls}}] {% with 'this is a long string' as ls %} {{ls}} {% endwith %} [{{ls}}]",
            "[]  this is a long string  []",
        ),
        ("{% with a=foo b=bar %}{{ b }}{{ a }}{% endwith %}", "BA"),
    ]);
}

#[test]
fn add_and_text_filters() {
    check(&[
        ("{{ '5'|add:6 }}", "11"),
        ("{{ 3|add:'8' }}", "11"),
        (
            "{{ \"String with 'quotes'.\" |addslashes }}",
            "String with \\'quotes\\'.",
        ),
        ("{{ 'foo fa fa'|capfirst }}", "Foo fa fa"),
        ("{{ \"Django\" | center:\"15\" }}", "     Django    "),
        ("{{ \"Django\" | center:\"16\" }}", "     Django     "),
        ("{{ \"Django\" | center:\"2\" }}", "Django"),
        ("{{ 'String with spaces' | cut:' ' }}", "Stringwithspaces"),
        ("{{ \"Django\" | ljust:\"10\" }}", "Django    "),
        ("{{ \"Django\" | ljust:\"2\" }}", "Django"),
        ("{{ \"Django\" | rjust:\"10\" }}", "    Django"),
        ("{{ \"Django\" | rjust:\"2\" }}", "Django"),
        ("{{ \"Still MAD At Yoko\" | lower }}", "still mad at yoko"),
        ("{{ \"Joel is a slug\" | upper }}", "JOEL IS A SLUG"),
        ("{{ \"my FIRST post\" | title }}", "My First Post"),
        ("{{ 'joel is a slug' | title }}", "Joel Is A Slug"),
        ("{{ \"1-800-COLLECT\" | phone2numeric }}", "1-800-2655328"),
        ("{{ 'joel is a slug' | wordcount }}", "4"),
        ("{{ 'Joel is a slug'|wordwrap:5 }}", "\nJoel\nis a\nslug"),
    ]);
}

#[test]
fn date_and_time_filters() {
    check(&[
        ("{{ past        | date }}", "Jan 10, 2002"),
        ("{{ before_past | date:'r' }}", "Tue, 08 Jan 2002 13:02:03"),
        ("{{ after_past  | date:'SHORT_DATE_FORMAT' }}", "03/01/2002"),
        ("{{ past        | time }}", "01:02:03 AM"),
        ("{{ before_past | time:'c' }}", "2002-01-08T13:02:03"),
        ("{{ after_past  | time:'YEAR_MONTH_FORMAT' }}", "March 2002"),
    ]);
}

#[test]
fn timesince_filter() {
    check(&[
        ("{{ past | timesince:before_past }}", "0&nbsp;minutes"),
        ("{{ before_past | timesince:past }}", "1&nbsp;day, 12&nbsp;hours"),
        ("{{ before_past | timesince:after_past }}", "1&nbsp;month, 3&nbsp;weeks"),
        ("{{ past | timesince:after_past }}", "1&nbsp;month, 2&nbsp;weeks"),
        ("{{ future | timesince }}", "0&nbsp;minutes"),
    ]);
}

#[test]
fn timeuntil_filter() {
    check(&[
        ("{{ past | timeuntil:before_past }}", "1&nbsp;day, 12&nbsp;hours"),
        ("{{ after_past | timeuntil:before_past }}", "1&nbsp;month, 3&nbsp;weeks"),
        ("{{ after_past | timeuntil:past }}", "1&nbsp;month, 2&nbsp;weeks"),
        ("{{ before_past | timeuntil:past }}", "0&nbsp;minutes"),
        ("{{ past | timeuntil }}", "0&nbsp;minutes"),
    ]);
}

#[test]
fn nonbreaking_space_option() {
    let options = Options {
        nonbreaking_space: " ".to_string(),
        ..Options::default()
    };
    let out = render_with("{{ before_past | timesince:past }}", &kitchen_sink(), &options);
    assert_eq!(out.unwrap(), "1 day, 12 hours");
}

#[test]
fn default_filters() {
    check(&[
        ("{{ True  |default:\"default\" }}", "True"),
        ("{{ False |default:\"default\" }}", "default"),
        ("{{ None  |default:\"default\" }}", "default"),
        ("{{ True  |default_if_none:\"default\" }}", "True"),
        ("{{ False |default_if_none:\"default\" }}", "False"),
        ("{{ None  |default_if_none:\"default\" }}", "default"),
    ]);
}

#[test]
fn dictsort_filters() {
    check(&[
        (
            "{{ friends }}",
            "age: 23, name: joe, age: 55, name: bob, age: 41, name: lou",
        ),
        (
            "{{ friends | dictsort:'name' }}",
            "age: 55, name: bob, age: 23, name: joe, age: 41, name: lou",
        ),
        (
            "{{ friends | dictsortreversed:'name' }}",
            "age: 41, name: lou, age: 23, name: joe, age: 55, name: bob",
        ),
    ]);
}

#[test]
fn number_filters() {
    check(&[
        ("{{ 21 | divisibleby:\"3\" }}", "True"),
        ("{{ 20 | divisibleby:\"3\" }}", "False"),
        ("{{ 123456789|filesizeformat }}", "117.7 MB"),
        ("{{34.23234|floatformat }}", "34.2"),
        ("{{34.00000|floatformat }}", "34"),
        ("{{34.26000|floatformat }}", "34.3"),
        ("{{34.23234|floatformat:3 }}", "34.232"),
        ("{{34.00000|floatformat:3 }}", "34.000"),
        ("{{34.26000|floatformat:3 }}", "34.260"),
        ("{{34.23234|floatformat:\"-3\" }}", "34.232"),
        ("{{34.00000|floatformat:\"-3\" }}", "34"),
        ("{{34.26000|floatformat:\"-3\" }}", "34.260"),
        ("{{ 123456789|get_digit:'2' }}", "8"),
        ("{{ -123456789|get_digit:'2' }}", "-123456789"),
        ("{{ 'foobar'|get_digit:'2' }}", "foobar"),
        ("{{ 255|stringformat:'x' }}", "ff"),
    ]);
}

#[test]
fn markup_filters() {
    check(&[
        (
            "{{ 'String & with & ampersands, but not &apos; or &#1234;' |fix_ampersands }}",
            "String &amp; with &amp; ampersands, but not &apos; or &#1234;",
        ),
        (
            "{{ \"<b>Joel</b> <button>is</button> a <span>slug</span>\" | removetags:\"b span\"|safe }}",
            "Joel <button>is</button> a slug",
        ),
        (
            "{{ \"<b>Begin</b> <foo /> <foo/> </foo> <foo> <span attr='value'>End</span>\" \
             | removetags:\"b span foo\"|safe }}",
            "Begin     End",
        ),
        (
            "{{ '<b>Joel</b> <button>is</button> a <span>slug</span>'|striptags }}",
            "Joel is a slug",
        ),
        (
            "{{xml_var|escape}}",
            "&lt;foo&gt;&lt;bar&gt;&lt;qux /&gt;&lt;/bar&gt;&lt;/foo&gt;",
        ),
    ]);
}

#[test]
fn list_filters() {
    check(&[
        ("{{ numbers|make_list}}", "[1, 2, 3, 4, 5, 6, 7, 8, 9]"),
        ("{{ 12345|make_list }}", "[1, 2, 3, 4, 5]"),
        ("{{ 'abcde'|first }}", "a"),
        ("{{ 'abcde'|last }}", "e"),
        ("{{ 'abcde'|length }}", "5"),
        ("{{ 'abcde'|length_is:'4' }}", "False"),
        ("{{ 'abcde'|length_is:'5' }}", "True"),
        ("{{ 'abcde'|length_is:'6' }}", "False"),
        ("{{ 'abcde'|join:'_' }}", "a_b_c_d_e"),
        ("{{ numbers|slice:'0:9'}}", "1, 2, 3, 4, 5, 6, 7, 8, 9"),
        ("{{ numbers|slice:':9'}}", "1, 2, 3, 4, 5, 6, 7, 8, 9"),
        ("{{ numbers|slice:':'}}", "1, 2, 3, 4, 5, 6, 7, 8, 9"),
        ("{{ numbers|slice:'0:'}}", "1, 2, 3, 4, 5, 6, 7, 8, 9"),
        ("{{ numbers|slice:'2:6'}}", "3, 4, 5, 6"),
        ("{{ numbers|slice:'-6:-2'}}", "4, 5, 6, 7"),
    ]);
}

#[test]
fn random_filter() {
    for _ in 0..10 {
        let out = render("{{ 'abcde'|random }}");
        assert!(["a", "b", "c", "d", "e"].contains(&out.as_str()), "{out:?}");
    }
}

#[test]
fn pluralize_filter() {
    check(&[
        ("ox{{ 0 | pluralize:'en' }}", "oxen"),
        ("ox{{ 1 | pluralize:'en' }}", "ox"),
        ("ox{{ 2 | pluralize:'en' }}", "oxen"),
        ("tank{{ 0 | pluralize }}", "tanks"),
        ("tank{{ 1 | pluralize }}", "tank"),
        ("tank{{ 2 | pluralize }}", "tanks"),
        ("cris{{ 0 | pluralize:'is,es' }}", "crises"),
        ("cris{{ 1 | pluralize:'is,es' }}", "crisis"),
        ("cris{{ 2 | pluralize:'is,es' }}", "crises"),
        ("ferr{{ 0 | pluralize:'y,ies' }}", "ferries"),
        ("ferr{{ 1 | pluralize:'y,ies' }}", "ferry"),
        ("ferr{{ 2 | pluralize:'y,ies' }}", "ferries"),
    ]);
}

#[test]
fn slugify_filter() {
    check(&[
        ("{{ ' Joel is a slug '|slugify }}", "joel-is-a-slug"),
        ("{{ '\tJoel\x0B is\n a\r slug\x01'|slugify }}", "joel-is-a-slug"),
    ]);
}

#[test]
fn truncate_filters() {
    let chars = [
        "", "...", "...", "...", "J...", "Jo...", "Joe...", "Joel...", "Joel ...",
        "Joel i...", "Joel is...", "Joel is ...", "Joel is a...", "Joel is a ...",
        "Joel is a slug", "Joel is a slug",
    ];
    for (n, expected) in chars.iter().enumerate() {
        assert_eq!(
            render(&format!("{{{{ \"Joel is a slug\" | truncatechars:{n} }}}}")),
            *expected,
        );
    }
    check(&[
        ("{{ \"Joel is a slug\" | truncatewords:0 }}", " ..."),
        ("{{ \"Joel is a slug\" | truncatewords:1 }}", "Joel ..."),
        ("{{ \"Joel is a slug\" | truncatewords:3 }}", "Joel is a ..."),
        ("{{ \"Joel is a slug\" | truncatewords:4 }}", "Joel is a slug"),
        ("{{ \"  Joel  is  a  slug  \" | truncatewords:2 }}", "Joel is ..."),
        ("{{ \"  Joel  is  a  slug  \" | truncatewords:5 }}", "Joel is a slug"),
    ]);
}

#[test]
fn truncate_html_filters() {
    check(&[
        ("{{ \"<p>Joel is a slug</p>\" | truncatechars_html:0 }}", ""),
        ("{{ \"<p>Joel is a slug</p>\" | truncatechars_html:1 }}", "<p>...</p>"),
        ("{{ \"<p>Joel is a slug</p>\" | truncatechars_html:9 }}", "<p>Joel i...</p>"),
        ("{{ \"<p>Joel is a slug</p>\" | truncatechars_html:14 }}", "<p>Joel is a slug</p>"),
        ("{{ \"<p>Joel is a slug\" | truncatechars_html:10 }}", "<p>Joel is...</p>"),
        ("{{ \"<p>Joel is a slug\" | truncatechars_html:15 }}", "<p>Joel is a slug</p>"),
        (
            "{{ \"Joel <a href='#'>is <i>a</i> slug\" | truncatechars_html:14 }}",
            "Joel <a href='#'>is <i>a</i> slug</a>",
        ),
        ("{{ \"<p>Joel is a slug</p>\" | truncatewords_html:0 }}", ""),
        ("{{ \"<p>Joel is a slug</p>\" | truncatewords_html:2 }}", "<p>Joel is ...</p>"),
        ("{{ \"<p>Joel is a slug\" | truncatewords_html:3 }}", "<p>Joel is a ...</p>"),
        ("{{ \"<p>Joel is a slug\" | truncatewords_html:5 }}", "<p>Joel is a slug"),
        (
            "{{ \"Joel <a href='#'>is <i>a</i> slug</a>\" | truncatewords_html:2 }}",
            "Joel <a href='#'>is ...</a>",
        ),
        (
            "{{ \"Joel <a href='#'>is <i>a</i> slug</a>\" | truncatewords_html:4 }}",
            "Joel <a href='#'>is <i>a</i> slug</a>",
        ),
        (
            "{{ \"Joel <a href='#'>is <i>a</i> slug\" | truncatewords_html:5 }}",
            "Joel <a href='#'>is <i>a</i> slug",
        ),
        (
            "{{ \"  Joel  <a href='#'>  is  <i>  a  </i>  slug  </a>  \" | truncatewords_html:3 }}",
            "  Joel  <a href='#'>  is  <i>  a ...</i></a>",
        ),
        (
            "{{ \"  Joel  <a href='#'>  is  <i>  a  </i>  slug  \" | truncatewords_html:5 }}",
            "  Joel  <a href='#'>  is  <i>  a  </i>  slug  ",
        ),
    ]);
}

#[test]
fn unordered_list_filter() {
    check(&[
        ("{{ 'abc'|unordered_list }}", "<li>abc</li>\n"),
        (
            "{{ places|unordered_list }}",
            "<li>Parent\n<ul>\n\t<li>States\n\t<ul>\n\t\t<li>Kansas\n\t\t<ul>\n\
             \t\t\t<li>Lawrence</li>\n\t\t\t<li>Topeka</li>\n\t\t</ul>\n\t\t</li>\n\
             \t\t<li>Illinois1</li>\n\t\t<li>Illinois2</li>\n\t</ul>\n\t</li>\n</ul>\n</li>\n",
        ),
    ]);
}

#[test]
fn url_filters() {
    check(&[
        (
            "{{ \"/this should/be encoded ^ because @ is not an option $ ()\" | urlencode }}",
            "/this%20should/be%20encoded%20%5E%20because%20%40%20is%20not%20an%20option%20%24%20%28%29",
        ),
        (
            "{{ \"This is some text containing a http://www.url.com sir and also another.url.com.\" | urlize }}",
            "This is some text containing a <a href='http://www.url.com'>http://www.url.com</a> \
             sir and also <a href='http://another.url.com'>another.url.com</a>.",
        ),
        (
            "{{ \"This is some text containing a http://www.url.com sir and also another.url.com.\" | urlizetrunc:15 }}",
            "This is some text containing a <a href='http://www.url.com'>http://www.url....</a> \
             sir and also <a href='http://another.url.com'>another.url.com</a>.",
        ),
    ]);
}

#[test]
fn yesno_filter() {
    check(&[
        ("{{ true_var|yesno:'Yes,No' }}", "Yes"),
        ("{{ false_var|yesno:'Yes,No' }}", "No"),
        ("{{ True  |yesno:\"yeah,no,maybe\" }}", "yeah"),
        ("{{ False |yesno:\"yeah,no,maybe\" }}", "no"),
        ("{{ None  |yesno:\"yeah,no,maybe\" }}", "maybe"),
        ("{{ None  |yesno:\"yeah,no\" }}", "no"),
    ]);
}

#[test]
fn filter_arity() {
    let render = |source| render_with(source, &kitchen_sink(), &Options::default());
    assert!(matches!(render("{{ foo|upper:1 }}"), Err(Error::SuperfluousArgument(_))));
    assert!(matches!(render("{{ foo|cut }}"), Err(Error::MissingArgument(_))));
}

#[test]
fn default_value_option() {
    let options = Options {
        default_value: Value::from("?"),
        ..Options::default()
    };
    let out = render_with("[{{ nope }}]", &Context::new(), &options).unwrap();
    assert_eq!(out, "[?]");
}

#[test]
fn autoescape_option() {
    let options = Options {
        autoescape: false,
        ..Options::default()
    };
    let out = render_with("{{ xml_var }}", &kitchen_sink(), &options).unwrap();
    assert_eq!(out, "<foo><bar><qux /></bar></foo>");
}

#[test]
fn renders_are_independent() {
    let template = Template::new("{% cycle 'a' 'b' %}{% ifchanged %}x{% endifchanged %}").unwrap();
    let context = Context::new();
    for _ in 0..2 {
        assert_eq!(template.render_to_string(&context).unwrap(), "ax");
    }
}

#[test]
fn context_is_not_changed() {
    let context = kitchen_sink();
    let template = Template::new("{% cycle 1 2 as counter %}").unwrap();
    assert_eq!(template.render_to_string(&context).unwrap(), "1");
    assert!(context.get("counter").is_none());
}

#[test]
fn formats_option() {
    let mut options = Options::default();
    options.formats.insert("DATE_FORMAT".to_string(), "Y".to_string());
    let out = render_with("{{ past|date }}", &kitchen_sink(), &options).unwrap();
    assert_eq!(out, "2002");
}
