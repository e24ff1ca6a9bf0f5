//! Structured flat-file formats.
//!
//! A structured file maps top-level keys to JSON-like values. Supported
//! formats:
//!
//! | format       | extensions                       |
//! |--------------|----------------------------------|
//! | properties   | `properties`, `cnf`, `conf`, `config` |
//! | json         | `json`, `js`                     |
//! | yaml         | `yml`, `yaml`                    |
//! | serialized   | `sl` (CBOR)                      |
//! | enum         | `txt`, `list`, `enum`            |

use crate::error::{StorageError, StorageResult};
use indexmap::IndexMap;
use serde_json::{Number, Value};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Top-level key/value document held by a structured file.
pub type Document = IndexMap<String, Value>;

/// On-disk format of a structured file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileFormat {
    /// `key=value` lines.
    Properties,
    /// A JSON object.
    Json,
    /// A YAML mapping.
    Yaml,
    /// A CBOR map.
    Serialized,
    /// One key per line; every value is `true`.
    Enum,
}

impl FileFormat {
    /// Picks a format from the file extension.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::UnsupportedFormat`] for an unknown or
    /// missing extension.
    pub fn detect(path: &Path) -> StorageResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .ok_or_else(|| StorageError::UnsupportedFormat(path.display().to_string()))?;

        match ext.as_str() {
            "properties" | "cnf" | "conf" | "config" => Ok(Self::Properties),
            "json" | "js" => Ok(Self::Json),
            "yml" | "yaml" => Ok(Self::Yaml),
            "sl" => Ok(Self::Serialized),
            "txt" | "list" | "enum" => Ok(Self::Enum),
            _ => Err(StorageError::UnsupportedFormat(path.display().to_string())),
        }
    }

    /// Short name used in errors and logs.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Properties => "properties",
            Self::Json => "json",
            Self::Yaml => "yaml",
            Self::Serialized => "serialized",
            Self::Enum => "enum",
        }
    }

    /// Parses file contents. Empty input is an empty document.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Format`] if the contents are malformed.
    pub fn parse(self, bytes: &[u8]) -> StorageResult<Document> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Document::new());
        }
        let err = |e: &dyn std::fmt::Display| StorageError::format(self.name(), e.to_string());

        match self {
            Self::Json => serde_json::from_slice(bytes).map_err(|e| err(&e)),
            Self::Yaml => serde_yaml::from_slice(bytes).map_err(|e| err(&e)),
            Self::Serialized => ciborium::de::from_reader(bytes).map_err(|e| err(&e)),
            Self::Properties => Ok(parse_properties(&text(self, bytes)?)),
            Self::Enum => Ok(text(self, bytes)?
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(|l| (l.to_string(), Value::Bool(true)))
                .collect()),
        }
    }

    /// Renders a document.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Format`] if the document cannot be
    /// represented.
    pub fn render(self, document: &Document) -> StorageResult<Vec<u8>> {
        let err = |e: &dyn std::fmt::Display| StorageError::format(self.name(), e.to_string());

        match self {
            Self::Json => serde_json::to_vec_pretty(document).map_err(|e| err(&e)),
            Self::Yaml => serde_yaml::to_string(document)
                .map(String::into_bytes)
                .map_err(|e| err(&e)),
            Self::Serialized => {
                let mut out = Vec::new();
                ciborium::ser::into_writer(document, &mut out).map_err(|e| err(&e))?;
                Ok(out)
            }
            Self::Properties => Ok(render_properties(document).into_bytes()),
            Self::Enum => {
                let mut out = String::new();
                for key in document.keys() {
                    out.push_str(key);
                    out.push('\n');
                }
                Ok(out.into_bytes())
            }
        }
    }
}

fn text(format: FileFormat, bytes: &[u8]) -> StorageResult<String> {
    String::from_utf8(bytes.to_vec()).map_err(|e| StorageError::format(format.name(), e.to_string()))
}

fn parse_properties(text: &str) -> Document {
    let mut document = Document::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, raw)) = line.split_once('=') else {
            continue;
        };
        document.insert(key.trim().to_string(), property_value(raw.trim()));
    }
    document
}

fn property_value(raw: &str) -> Value {
    match raw.to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" => return Value::Bool(true),
        "off" | "false" | "no" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(int) = raw.parse::<i64>() {
        return Value::Number(int.into());
    }
    if let Some(num) = raw.parse::<f64>().ok().and_then(Number::from_f64) {
        return Value::Number(num);
    }
    Value::String(raw.to_string())
}

fn render_properties(document: &Document) -> String {
    let mut out = String::new();
    for (key, value) in document {
        let rendered = match value {
            Value::Bool(true) => "on".to_string(),
            Value::Bool(false) => "off".to_string(),
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            // nested values are stored as inline JSON
            other => other.to_string(),
        };
        out.push_str(key);
        out.push('=');
        out.push_str(&rendered);
        out.push('\n');
    }
    out
}

/// A flat file holding one [`Document`].
///
/// Mirrors the host's config-file capability: load everything with
/// [`get_all`](Self::get_all), replace it with [`set_all`](Self::set_all),
/// and write it back with [`save`](Self::save). All I/O is blocking; async
/// callers run it under `spawn_blocking`.
#[derive(Debug, Clone)]
pub struct StructuredFile {
    path: PathBuf,
    format: FileFormat,
    document: Document,
}

impl StructuredFile {
    /// Opens `path`, reading its current contents. A missing file is an
    /// empty document.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>, format: FileFormat) -> StorageResult<Self> {
        let path = path.into();
        let document = match fs::read(&path) {
            Ok(bytes) => format.parse(&bytes)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Document::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            format,
            document,
        })
    }

    /// Returns the file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the file format.
    #[must_use]
    pub fn format(&self) -> FileFormat {
        self.format
    }

    /// Returns the whole document.
    #[must_use]
    pub fn get_all(&self) -> &Document {
        &self.document
    }

    /// Replaces the whole document. Nothing is written until
    /// [`save`](Self::save).
    pub fn set_all(&mut self, document: Document) {
        self.document = document;
    }

    /// Mutable access to the document.
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    /// Writes the document atomically (temp file, then rename), creating
    /// parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering or any file operation fails.
    pub fn save(&self) -> StorageResult<()> {
        let bytes = self.format.render(&self.document)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let temp_path = self.path.with_extension("tmp");
        {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn sample() -> Document {
        let mut doc = Document::new();
        doc.insert("name".into(), json!("arena"));
        doc.insert("max".into(), json!(16));
        doc.insert("open".into(), json!(true));
        doc
    }

    #[test]
    fn detect_by_extension() {
        let cases = [
            ("a.properties", FileFormat::Properties),
            ("a.conf", FileFormat::Properties),
            ("a.json", FileFormat::Json),
            ("a.JS", FileFormat::Json),
            ("a.yml", FileFormat::Yaml),
            ("a.yaml", FileFormat::Yaml),
            ("a.sl", FileFormat::Serialized),
            ("a.txt", FileFormat::Enum),
            ("a.list", FileFormat::Enum),
        ];
        for (name, expected) in cases {
            assert_eq!(FileFormat::detect(Path::new(name)).unwrap(), expected, "{name}");
        }
    }

    #[test]
    fn detect_rejects_unknown() {
        assert!(matches!(
            FileFormat::detect(Path::new("a.exe")),
            Err(StorageError::UnsupportedFormat(_))
        ));
        assert!(FileFormat::detect(Path::new("noext")).is_err());
    }

    #[test]
    fn structured_formats_round_trip() {
        let mut doc = sample();
        doc.insert("nested".into(), json!({"a": [1, 2, {"b": null}]}));
        for format in [FileFormat::Json, FileFormat::Yaml, FileFormat::Serialized] {
            let bytes = format.render(&doc).unwrap();
            assert_eq!(format.parse(&bytes).unwrap(), doc, "{}", format.name());
        }
    }

    #[test]
    fn properties_scalars() {
        let doc = FileFormat::Properties
            .parse(b"# comment\nname=arena\nmax = 16\nopen=on\nclosed=off\nratio=0.5\n")
            .unwrap();
        assert_eq!(doc["name"], json!("arena"));
        assert_eq!(doc["max"], json!(16));
        assert_eq!(doc["open"], json!(true));
        assert_eq!(doc["closed"], json!(false));
        assert_eq!(doc["ratio"], json!(0.5));

        let rendered = String::from_utf8(FileFormat::Properties.render(&sample()).unwrap()).unwrap();
        assert_eq!(rendered, "name=arena\nmax=16\nopen=on\n");
    }

    #[test]
    fn enum_lists_keys() {
        let doc = FileFormat::Enum.parse(b"steve\n\n alex \n").unwrap();
        assert_eq!(doc.keys().collect::<Vec<_>>(), ["steve", "alex"]);
        assert!(doc.values().all(|v| *v == json!(true)));
        assert_eq!(FileFormat::Enum.render(&doc).unwrap(), b"steve\nalex\n");
    }

    #[test]
    fn malformed_json_is_format_error() {
        let result = FileFormat::Json.parse(b"{\"a\": ");
        assert!(matches!(result, Err(StorageError::Format { format: "json", .. })));
    }

    #[test]
    fn empty_input_is_empty_document() {
        for format in [FileFormat::Json, FileFormat::Yaml, FileFormat::Enum] {
            assert!(format.parse(b"  \n").unwrap().is_empty());
        }
    }

    #[test]
    fn structured_file_save_and_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("data.yml");

        let mut file = StructuredFile::open(&path, FileFormat::Yaml).unwrap();
        assert!(file.get_all().is_empty());
        file.set_all(sample());
        file.save().unwrap();

        let reopened = StructuredFile::open(&path, FileFormat::Yaml).unwrap();
        assert_eq!(reopened.get_all(), &sample());
        assert!(!path.with_extension("tmp").exists());
    }
}
