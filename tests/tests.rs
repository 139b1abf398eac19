use std::env;
use std::fs;
use std::path::PathBuf;

use chrono::NaiveDate;

use dsv::convert::Converters;
use dsv::diff::{self, DiffMode};
use dsv::table::{Dictionary, TableReader, TableWriter};
use dsv::{
    decode_line, encode_row, Dialect, Error, Headers, ParseErrorKind, Reader,
    ReaderBuilder, StringRecord, Writer, WriterBuilder,
};

static PEOPLE: &'static str = include_str!("data/people.dsv");

fn records(data: &str) -> Vec<StringRecord> {
    Reader::from_reader(data.as_bytes())
        .into_records()
        .map(|r| r.unwrap())
        .collect()
}

fn records_with(builder: &ReaderBuilder, data: &str) -> Vec<StringRecord> {
    builder
        .from_reader(data.as_bytes())
        .into_records()
        .map(|r| r.unwrap())
        .collect()
}

fn people() -> TableReader<&'static [u8]> {
    let rdr = ReaderBuilder::new()
        .allow_comments(true)
        .has_headers(true)
        .from_reader(PEOPLE.as_bytes());
    TableReader::new(rdr).unwrap()
}

fn tmp_path(name: &str) -> PathBuf {
    let mut path = env::temp_dir();
    path.push(format!("dsv-{}-{}", std::process::id(), name));
    path
}

#[test]
fn scenario_plain_fields() {
    assert_eq!(records("aaa1;bbb1;ccc1"), vec![vec!["aaa1", "bbb1", "ccc1"]]);
}

#[test]
fn scenario_quoted_spaces() {
    assert_eq!(
        records("\"a a a\";\"b b b\""),
        vec![vec!["a a a", "b b b"]]
    );
}

#[test]
fn scenario_doubled_quotes_and_separators() {
    assert_eq!(
        records(r#""a""a""a";"b;b;b""#),
        vec![vec![r#"a"a"a"#, "b;b;b"]]
    );
}

#[test]
fn scenario_unterminated_quote() {
    let err = decode_line(&Dialect::default(), "\"abc").unwrap_err();
    assert_eq!(err.kind(), ParseErrorKind::UnterminatedQuote);

    let mut rdr = Reader::from_reader("\"abc".as_bytes());
    let mut rec = StringRecord::new();
    match rdr.read_record(&mut rec) {
        Err(Error::Parse(err)) => {
            assert_eq!(err.kind(), ParseErrorKind::UnterminatedQuote);
            assert_eq!(err.line(), 1);
        }
        r => panic!("expected parse error but got {:?}", r),
    }
    assert!(rec.is_empty());
}

#[test]
fn scenario_encode_missing_and_separator() {
    let line = encode_row(&Dialect::default(), vec![Some("a"), None, Some("c;d")]);
    assert_eq!(line, r#"a;;"c;d""#);
}

#[test]
fn scenario_updated_only_diff() {
    let keyed = |data: &'static str| {
        let mut rdr = TableReader::from_reader(data.as_bytes()).unwrap();
        Dictionary::from_table(&mut rdr, "Id").unwrap()
    };
    let old = keyed("Id;F2\n1;x\n2;y");
    let new = keyed("Id;F2\n1;x\n2;z");

    let changes = diff::compare(&old, &new, DiffMode::UpdatedOnly);
    let headers = Headers::new(vec!["Id", "F2"]).unwrap();
    let mut wtr = TableWriter::from_writer(vec![], headers);
    assert_eq!(diff::write_changes(&mut wtr, &changes).unwrap(), 1);

    let out = String::from_utf8(wtr.into_inner().into_inner().unwrap()).unwrap();
    let mut lines = out.lines();
    assert_eq!(lines.next(), Some("Id;F2"));
    assert_eq!(lines.collect::<Vec<_>>(), vec!["2;z"]);
}

#[test]
fn comments_are_invisible() {
    let mut builder = ReaderBuilder::new();
    builder.allow_comments(true);
    for n in 0..5 {
        let mut data = "# header comment\n".repeat(n);
        data.push_str("a;b;c\n");
        data.push_str(&"#trailing\n".repeat(n));
        let got = records_with(&builder, &data);
        assert_eq!(got.len(), 1, "{} comment lines", n);
        assert_eq!(got[0].len(), 3);
    }

    let got = records_with(&builder, "#x\n1;2\n#y\n#z\n3;4\n");
    assert_eq!(got, vec![vec!["1", "2"], vec!["3", "4"]]);
}

#[test]
fn comment_marker_is_plain_text_when_disabled() {
    assert_eq!(records("#a;b\n"), vec![vec!["#a", "b"]]);
}

#[test]
fn blank_lines_are_skipped() {
    let got = records("a;b\n\n\r\n\r\rc;d\n\n");
    assert_eq!(got, vec![vec!["a", "b"], vec!["c", "d"]]);
    assert_eq!(got[1].line(), Some(6));
}

#[test]
fn whitespace() {
    assert_eq!(records("\"a\tb\"; 2 "), vec![vec!["a b", " 2 "]]);
    assert_eq!(records("   \n"), vec![vec!["   "]]);
    assert_eq!(records("\"x\"  ;y"), vec![vec!["x", "y"]]);
}

#[test]
fn line_terminators() {
    let got = records("a\rb\r\nc\nd");
    assert_eq!(got, vec![vec!["a"], vec!["b"], vec!["c"], vec!["d"]]);
}

#[test]
fn misplaced_quote_is_an_error() {
    let mut rdr = Reader::from_reader("ok\nab\"c\n".as_bytes());
    let results: Vec<_> = rdr.records().collect();
    assert!(results[0].is_ok());
    match results[1] {
        Err(Error::Parse(ref err)) => {
            assert_eq!(err.kind(), ParseErrorKind::UnexpectedQuote);
            assert_eq!(err.line(), 2);
            assert!(Error::Parse(*err).to_string().starts_with("line 2: "));
        }
        ref r => panic!("expected parse error but got {:?}", r),
    }
}

#[test]
fn missing_separator_is_an_error() {
    let err = decode_line(&Dialect::default(), "\"a\"b").unwrap_err();
    assert_eq!(err.kind(), ParseErrorKind::MissingSeparator);
}

#[test]
fn write_then_read() {
    let rows: Vec<Vec<&str>> = vec![
        vec!["plain", "", "with;separator"],
        vec!["with \"quotes\"", "multi\nline", "cr\rlf"],
        vec![""],
        vec!["#not a comment", " padded "],
    ];

    let mut wtr = WriterBuilder::new().allow_comments(true).from_writer(vec![]);
    for row in &rows {
        wtr.write_record(row).unwrap();
    }
    let data = String::from_utf8(wtr.into_inner().unwrap()).unwrap();

    let got = records_with(ReaderBuilder::new().allow_comments(true), &data);
    assert_eq!(got, rows);
}

#[test]
fn encoding_is_stable() {
    let dialect = Dialect::default();
    let fields = vec![Some("a\"b"), Some(""), None, Some("x;y"), Some("z\r\n")];
    let once = encode_row(&dialect, fields);

    let decoded = decode_line(&dialect, &once).unwrap();
    let twice = encode_row(&dialect, decoded.iter().map(|f| Some(f.as_str())));
    assert_eq!(once, twice);
    assert_eq!(decoded, vec!["a\"b", "", "", "x;y", "z\r\n"]);
}

#[test]
fn custom_dialect_round_trip() {
    let mut dialect = Dialect::default();
    dialect.separator = '|';
    dialect.quote = '\'';
    dialect.force_quotes = true;
    dialect.validate().unwrap();

    let mut wtr = WriterBuilder::new().dialect(dialect).from_writer(vec![]);
    wtr.write_record(&["it's", "a|b", ""]).unwrap();
    let data = String::from_utf8(wtr.into_inner().unwrap()).unwrap();
    assert_eq!(data, "'it''s'|'a|b'|''\n");

    let got = records_with(ReaderBuilder::new().dialect(dialect), &data);
    assert_eq!(got, vec![vec!["it's", "a|b", ""]]);
}

#[test]
fn table_with_converters() {
    let convs = Converters::with_defaults();
    let mut rdr = people();
    assert_eq!(
        rdr.headers().iter().collect::<Vec<_>>(),
        vec!["Id", "Name", "Born", "Score", "Active"]
    );

    let rows: Vec<_> = rdr.rows().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 4);

    assert_eq!(rows[1].get("Name").unwrap(), "Hopper; Grace");
    assert_eq!(rows[1].parse_opt::<f64>("Score", &convs).unwrap(), None);
    assert!(rows[1].parse::<bool>("Active", &convs).unwrap());
    assert_eq!(rows[1].line(), Some(5));

    assert_eq!(rows[2].get("Name").unwrap(), "Alan \"Prof\" Turing");
    assert_eq!(
        rows[2].parse::<NaiveDate>("Born", &convs).unwrap(),
        NaiveDate::from_ymd_opt(1912, 6, 23).unwrap()
    );

    assert_eq!(rows[3].get("Name").unwrap(), "Multi\nline");
    assert_eq!(rows[3].get("Score").unwrap(), " 12 ");
    assert_eq!(rows[3].parse::<u8>("Score", &convs).unwrap(), 12);
    assert!(!rows[3].parse::<bool>("Active", &convs).unwrap());
    assert_eq!(rows[3].line(), Some(8));
}

#[test]
fn dictionary_from_file_data() {
    let dict = Dictionary::from_table(&mut people(), "Id").unwrap();
    assert_eq!(dict.len(), 4);
    assert_eq!(dict.get("1").unwrap().get("Born").unwrap(), "1815-12-10");
    assert!(dict.get("5").is_none());
}

#[test]
fn files() {
    let path = tmp_path("files.dsv");
    {
        let mut wtr = Writer::from_path(&path).unwrap();
        wtr.write_record(&["a", "b"]).unwrap();
        wtr.write_record(&["1", "2"]).unwrap();
        wtr.flush().unwrap();
    }
    let mut rdr = ReaderBuilder::new().has_headers(true).from_path(&path).unwrap();
    assert_eq!(rdr.headers().unwrap(), &vec!["a", "b"]);
    let got: Vec<StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
    assert_eq!(got, vec![vec!["1", "2"]]);
    fs::remove_file(&path).unwrap();

    assert!(Reader::from_path(tmp_path("does-not-exist")).unwrap_err().is_io_error());
}

#[cfg(feature = "serde")]
mod serde_records {
    use serde::{Deserialize, Serialize};

    use dsv::{Error, ReaderBuilder, Writer};

    #[derive(Debug, Deserialize, PartialEq, Serialize)]
    struct Person {
        id: u32,
        name: String,
        score: Option<f64>,
        kind: Kind,
    }

    #[derive(Debug, Deserialize, PartialEq, Serialize)]
    enum Kind {
        Staff,
        Guest,
    }

    #[test]
    fn round_trip() {
        let people = vec![
            Person { id: 1, name: "a;b".into(), score: Some(1.5), kind: Kind::Staff },
            Person { id: 2, name: "c\nd".into(), score: None, kind: Kind::Guest },
        ];

        let mut wtr = Writer::from_writer(vec![]);
        for p in &people {
            wtr.serialize(p).unwrap();
        }
        let data = String::from_utf8(wtr.into_inner().unwrap()).unwrap();
        assert_eq!(
            data,
            "id;name;score;kind\n1;\"a;b\";1.5;Staff\n2;\"c\nd\";;Guest\n"
        );

        let mut rdr =
            ReaderBuilder::new().has_headers(true).from_reader(data.as_bytes());
        let got: Vec<Person> = rdr.deserialize().map(|r| r.unwrap()).collect();
        assert_eq!(got, people);
    }

    #[test]
    fn error_has_line() {
        let data = "id;name;score;kind\n1;x;;Staff\n\nnope;y;;Guest\n";
        let mut rdr =
            ReaderBuilder::new().has_headers(true).from_reader(data.as_bytes());
        let results: Vec<Result<Person, Error>> = rdr.deserialize().collect();
        assert!(results[0].is_ok());
        match results[1] {
            Err(ref err @ Error::Deserialize { .. }) => {
                assert_eq!(err.line(), Some(4));
            }
            ref r => panic!("expected deserialize error but got {:?}", r),
        }
    }
}

#[cfg(feature = "async")]
mod async_io {
    use dsv::{ReaderBuilder, StringRecord, WriterBuilder};

    #[tokio::test]
    async fn write_then_read() {
        let mut wtr = WriterBuilder::new().from_async_writer(vec![]);
        wtr.write_record(&["x", "y;z"]).await.unwrap();
        wtr.write_record(&[""]).await.unwrap();
        let data = wtr.into_inner().await.unwrap();

        let mut rdr = ReaderBuilder::new()
            .buffer_capacity(3)
            .from_async_reader(&data[..]);
        let mut rec = StringRecord::new();
        let mut got = vec![];
        while rdr.read_record(&mut rec).await.unwrap() {
            got.push(rec.clone());
        }
        assert_eq!(got, vec![vec!["x", "y;z"], vec![""]]);
    }
}
