//! Layered configuration: a file deserialized with serde, then overridden by
//! tag-driven decoders such as the environment loader.

pub mod error;
pub mod format;
mod reader;

pub use error::ConfigError;
pub use format::{FormatParser, JsonParser, TomlParser};
pub use reader::ConfigReader;

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::PathBuf;

    use pretty_assertions::assert_eq;
    use serde::Deserialize;
    use tagbind::source::Query;
    use tagbind::{Decode, Decoder};
    use tagbind_env::Loader;

    use super::*;

    #[derive(Decode, Deserialize, Default, Debug, PartialEq)]
    struct Tls {
        cert: String,
    }

    #[derive(Decode, Deserialize, Default, Debug, PartialEq)]
    struct App {
        name: String,
        port: u16,
        #[serde(default)]
        #[bind(query = "debug")]
        debug: bool,
        #[serde(default)]
        tls: Option<Tls>,
    }

    fn write(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn env(vars: &[(&str, &str)]) -> Loader {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Loader::new()
            .with_prefix("APP_")
            .with_lookup(move |name: &str| vars.get(name).cloned())
    }

    #[test]
    fn file_then_layers_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "app.toml",
            "name = \"svc\"\nport = 80\n\n[tls]\ncert = \"/etc/cert.pem\"\n",
        );

        let reader = ConfigReader::new()
            .with_env(env(&[("APP_PORT", "8080"), ("APP_DEBUG", "false")]))
            .with_layer("query", Decoder::new("query"), Query::parse("debug=1"));

        let mut app = App::default();
        reader.read_file(&path, &mut app).unwrap();

        assert_eq!(
            app,
            App {
                name: "svc".into(),
                port: 8080,
                debug: true,
                tls: Some(Tls {
                    cert: "/etc/cert.pem".into(),
                }),
            }
        );
        assert_eq!(reader.layers().collect::<Vec<_>>(), vec!["env", "query"]);
    }

    #[test]
    fn json_files_and_case_insensitive_extensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "APP.JSON", r#"{"name": "svc", "port": 81}"#);

        let mut app = App::default();
        ConfigReader::new().read_file(&path, &mut app).unwrap();

        assert_eq!(app.name, "svc");
        assert_eq!(app.port, 81);
        assert_eq!(app.tls, None);
    }

    #[test]
    fn layers_without_fields_for_the_type_are_skipped() {
        #[derive(Decode, Default)]
        struct OnlyFlags {
            #[bind(flag = "verbose")]
            verbose: bool,
        }

        let reader = ConfigReader::new()
            .with_layer("query", Decoder::new("query"), Query::parse("verbose=1"))
            .with_layer("flags", Decoder::new("flag"), [("verbose", "true")]);

        let mut flags = OnlyFlags::default();
        reader.read(&mut flags).unwrap();
        assert!(flags.verbose);
    }

    #[test]
    fn layer_errors_name_the_layer() {
        let reader = ConfigReader::new().with_env(env(&[("APP_PORT", "abc")]));

        let err = reader.read(&mut App::default()).unwrap_err();

        assert!(matches!(&err, ConfigError::Layer { layer, .. } if layer == "env"));
        assert_eq!(err.decode_error().and_then(|e| e.key()), Some("PORT"));
    }

    #[test]
    fn unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "app.yaml", "name: svc\n");

        let err = ConfigReader::new()
            .read_file(&path, &mut App::default())
            .unwrap_err();

        assert!(matches!(err, ConfigError::UnsupportedFormat(ext) if ext == "yaml"));
    }

    #[test]
    fn missing_and_malformed_files_mention_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let reader = ConfigReader::new();

        let missing = dir.path().join("missing.toml");
        let err = reader.read_file(&missing, &mut App::default()).unwrap_err();
        assert!(err.to_string().contains("missing.toml"), "{err}");

        let broken = write(&dir, "broken.toml", "name = \n");
        let err = reader.read_file(&broken, &mut App::default()).unwrap_err();
        assert!(matches!(&err, ConfigError::Config(msg) if msg.contains("broken.toml")));

        let wrong_type = write(&dir, "wrong.toml", "name = \"svc\"\nport = \"x\"\n");
        let err = reader.read_file(&wrong_type, &mut App::default()).unwrap_err();
        assert!(matches!(&err, ConfigError::Config(msg) if msg.contains("wrong.toml")));
    }

    /// `key=value` lines, values kept as strings.
    struct KvParser;

    impl FormatParser for KvParser {
        fn extensions(&self) -> &[&str] {
            &["kv", "json"]
        }

        fn parse(&self, content: &str) -> Result<serde_json::Value, ConfigError> {
            let mut map = serde_json::Map::new();
            for line in content.lines().filter(|line| !line.trim().is_empty()) {
                let (key, value) = line
                    .split_once('=')
                    .ok_or_else(|| ConfigError::Config(format!("bad line {line:?}")))?;
                map.insert(key.trim().to_owned(), value.trim().into());
            }
            Ok(serde_json::Value::Object(map))
        }
    }

    #[derive(Deserialize, Decode, Default, Debug)]
    struct Names {
        first: String,
        last: String,
    }

    #[test]
    fn registered_parsers_take_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let reader = ConfigReader::new().with_parser(KvParser);

        let mut names = Names::default();
        reader
            .read_file(write(&dir, "names.kv", "first = Ada\nlast = Lovelace\n"), &mut names)
            .unwrap();
        assert_eq!((names.first.as_str(), names.last.as_str()), ("Ada", "Lovelace"));

        let mut names = Names::default();
        reader
            .read_file(write(&dir, "names.json", "first=Grace\nlast=Hopper"), &mut names)
            .unwrap();
        assert_eq!(names.first, "Grace");
    }
}
