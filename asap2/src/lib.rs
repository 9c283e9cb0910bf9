//! asap2 is a library that reads, modifies and writes ASAP2 (a2l) files.
//!
//! The structure of the format is declared once, in a compact specification that is expanded by
//! the `asap2macros` crate. This generates the typed node structs together with static schema
//! tables, and both the decoder and the encoder are driven by these tables.
//!
//! Every node carries a sequence number which is assigned by the [`BuildContext`] of its
//! document. Named nodes are stored in dictionaries ([`ItemList`]), and they are written in the
//! order of their sequence numbers, so a file that is loaded and written again keeps its order.
//!
//! # Features
//!
//! - `check`: perform a consistency check on the data

#[cfg(feature = "check")]
mod checker;
mod decoder;
mod encoder;
mod itemlist;
mod loader;
mod node;
mod schema;
mod sequence;
mod specification;
mod tokenizer;
mod value;
mod writer;

use std::convert::AsRef;
use std::ffi::OsString;
use std::fmt::Display;
use std::path::Path;
use std::path::PathBuf;
use thiserror::Error;
// used internally
use decoder::ParserState;

// re-export for the crate user
pub use decoder::{A2lVersion, DecodeError};
pub use encoder::{EncodeError, EncodeOptions, encode};
pub use itemlist::{ItemList, ItemListError};
pub use node::{
    A2lObjectName, A2lObjectNameSetter, EnumLabel, FieldRef, Node, NodeType, ScalarRef, ToScalar,
};
pub use schema::{
    EnumSchema, FieldDescriptor, FieldRole, Keyword, NodeKind, NodeSchema, SchemaError,
    SchemaRegistry, ValueType, registry,
};
pub use sequence::{BuildContext, SequenceNumber};
pub use specification::*;
pub use tokenizer::TokenizerError;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum A2lError {
    /// `FileOpenError`: An `IoError` that occurred while loading a file
    #[error("Failed to load {filename}: {ioerror}")]
    FileOpenError {
        filename: PathBuf,
        ioerror: std::io::Error,
    },

    /// `FileReadError`: An `IoError` that occurred while reading from a file
    #[error("Could not read from {filename}: {ioerror}")]
    FileReadError {
        filename: PathBuf,
        ioerror: std::io::Error,
    },

    /// `EmptyFileError`: No `A2lTokens` found in the file
    #[error("File \"{filename}\" contains no a2l data")]
    EmptyFileError { filename: PathBuf },

    /// `TokenizerError`: Failed to tokenize the input
    #[error("Tokenizer error: {tokenizer_error}")]
    TokenizerError { tokenizer_error: TokenizerError },

    /// `SchemaError`: the built-in node specification is inconsistent
    #[error("Schema error: {schema_error}")]
    SchemaError { schema_error: SchemaError },

    /// `DecodeError`: Invalid data, the file could not be decoded
    #[error("Decode error: {decode_error}")]
    DecodeError { decode_error: DecodeError },

    /// `EncodeError`: the data cannot be written as valid a2l text
    #[error("Encode error: {encode_error}")]
    EncodeError { encode_error: EncodeError },

    /// `FileWriteError`: An `IoError` that occurred while writing from a file
    #[error("Could not write to {filename}: {ioerror}")]
    FileWriteError {
        filename: PathBuf,
        ioerror: std::io::Error,
    },

    /// `ContentError`: A block contains invalid content of some description
    #[error("Content error: {blockname} {item_name}: {description}")]
    ContentError {
        item_name: String,
        blockname: String,
        description: String,
    },
}

/// A loaded or newly created a2l file
///
/// The document owns the [`BuildContext`] that hands out sequence numbers. Nodes that are added
/// to the file should be created with this context, so that they are written after the existing
/// nodes of the same dictionary.
#[derive(Debug)]
pub struct A2lDocument {
    pub file: A2lFile,
    pub context: BuildContext,
}

/**
Create a new a2l file

```rust
let new_a2l = asap2::new();
assert_eq!(new_a2l.file.project.module.len(), 1);
```

The created file is equivalent to loading a string containing
```text
ASAP2_VERSION 1 71
/begin PROJECT new_project ""
  /begin MODULE new_module ""
  /end MODULE
/end PROJECT
```
 */
#[must_use]
pub fn new() -> A2lDocument {
    let mut context = BuildContext::new();
    let asap2_version = Asap2Version::new(&mut context, 1, 71);
    // a minimal a2l file needs only a PROJECT containing a MODULE
    let mut project = Project::new(&mut context, "new_project".to_string(), String::new());
    let module = Module::new(&mut context, "new_module".to_string(), String::new());
    // the list is empty, so there can't be a name collision
    let _ = project.module.push(module);

    let mut file = A2lFile::new(&mut context, project);
    file.asap2_version = Some(asap2_version);

    A2lDocument { file, context }
}

/**
Load an a2l file

The returned `Vec<A2lError>` receives all warnings generated during decoding, e.g. if the file
has no `ASAP2_VERSION` or uses an unknown version.

# Example
```
# use asap2::A2lError;
match asap2::load("example.a2l") {
    Ok((a2l_document, log_messages)) => {/* do something with it*/},
    Err(error_message) => println!("{error_message}")
}
```

# Errors

An `A2lError` provides details information if loading the file fails.
 */
pub fn load<P: AsRef<Path>>(path: P) -> Result<(A2lDocument, Vec<A2lError>), A2lError> {
    let pathref = path.as_ref();
    let filedata = loader::load(pathref)?;
    load_impl(pathref, &filedata)
}

/**
load a2l data stored in a string

`a2ldata` contains the text of an a2l file.

# Example

```rust
# use asap2::A2lError;
# use asap2::A2lObjectName;
# fn main() -> Result<(), A2lError> {
let text = r#"
ASAP2_VERSION 1 71
/begin PROJECT new_project ""
  /begin MODULE new_module ""
  /end MODULE
/end PROJECT
"#;
let (a2l, log_msgs) = asap2::load_from_string(&text)?;
assert_eq!(a2l.file.project.module[0].get_name(), "new_module");
# Ok(())
# }
```

# Errors

An `A2lError` provides details information if loading the data fails.
 */
pub fn load_from_string(a2ldata: &str) -> Result<(A2lDocument, Vec<A2lError>), A2lError> {
    let pathref = Path::new("");
    load_impl(pathref, a2ldata)
}

fn load_impl(path: &Path, filedata: &str) -> Result<(A2lDocument, Vec<A2lError>), A2lError> {
    let mut log_msgs = Vec::<A2lError>::new();
    // tokenize the input data
    let tokenresult = tokenizer::tokenize(&Filename::from(path), 0, filedata)
        .map_err(|tokenizer_error| A2lError::TokenizerError { tokenizer_error })?;

    if tokenresult.tokens.is_empty() {
        return Err(A2lError::EmptyFileError {
            filename: path.to_path_buf(),
        });
    }

    let registry = registry().map_err(|schema_error| A2lError::SchemaError { schema_error })?;
    let mut context = BuildContext::new();

    // build the a2l data structures from the tokens
    let mut parser = ParserState::new(&tokenresult, &mut log_msgs, &mut context, registry);
    let file = parser
        .parse_file::<A2lFile>()
        .map_err(|decode_error| A2lError::DecodeError { decode_error })?;

    Ok((A2lDocument { file, context }, log_msgs))
}

/// load an a2l fragment
///
/// A fragment is the text of a single node of type `T`, for example one `/begin MEASUREMENT`
/// block. The input must end after the node. Sequence numbers are taken from `context`, which
/// would normally be the context of the document that the node is going to be added to.
///
/// ```rust
/// # use asap2::{A2lObjectName, Measurement};
/// let mut document = asap2::new();
/// let measurement: Measurement = asap2::load_fragment(
///     r#"/begin MEASUREMENT speed "" UWORD conv 1 0 0 100 /end MEASUREMENT"#,
///     &mut document.context,
/// ).unwrap();
/// assert_eq!(measurement.get_name(), "speed");
/// ```
///
/// # Errors
///
/// If the fragment cannot be decoded, the `A2lError` will give details about the problem.
pub fn load_fragment<T: NodeType>(a2ldata: &str, context: &mut BuildContext) -> Result<T, A2lError> {
    let tokenresult = tokenizer::tokenize(&Filename::from("(fragment)"), 0, a2ldata)
        .map_err(|tokenizer_error| A2lError::TokenizerError { tokenizer_error })?;
    let registry = registry().map_err(|schema_error| A2lError::SchemaError { schema_error })?;

    // a fragment has no version information, so there are no warnings to collect
    let mut log_msgs = Vec::<A2lError>::new();
    let mut parser = ParserState::new(&tokenresult, &mut log_msgs, context, registry);
    parser
        .parse_fragment()
        .map_err(|decode_error| A2lError::DecodeError { decode_error })
}

/// encode a single node and all of its children
///
/// # Errors
///
/// [`A2lError::EncodeError`] if the node contains data that cannot be written.
pub fn encode_fragment(node: &dyn Node, options: &EncodeOptions) -> Result<String, A2lError> {
    encode(node, options).map_err(|encode_error| A2lError::EncodeError { encode_error })
}

impl A2lDocument {
    /// construct a string containing the whole a2l data of this document
    ///
    /// # Errors
    ///
    /// [`A2lError::EncodeError`] if the document contains data that cannot be written.
    pub fn write_to_string(&self) -> Result<String, A2lError> {
        self.write_to_string_with(&EncodeOptions::default())
    }

    /// construct a string containing the whole a2l data of this document, using the given options
    ///
    /// # Errors
    ///
    /// [`A2lError::EncodeError`] if the document contains data that cannot be written.
    pub fn write_to_string_with(&self, options: &EncodeOptions) -> Result<String, A2lError> {
        encode_fragment(&self.file, options)
    }

    /// write this document to the given file
    /// the banner will be placed inside a comment at the beginning of the file; `/*` and `*/` should not be part of the banner string
    ///
    /// # Errors
    ///
    /// [`A2lError::EncodeError`] if the document cannot be encoded, or
    /// [`A2lError::FileWriteError`] if writing the file fails.
    pub fn write<P: AsRef<Path>>(&self, path: P, banner: Option<&str>) -> Result<(), A2lError> {
        let mut outstr = String::new();

        let file_text = self.write_to_string()?;

        if let Some(banner_text) = banner {
            outstr = format!("/* {banner_text} */");
            // if the first line is empty (first charachter is \n), then the banner is placed on the empty line
            // otherwise a newline is added
            if !file_text.starts_with('\n') {
                outstr.push('\n');
            }
        }
        outstr.push_str(&file_text);

        std::fs::write(&path, outstr).map_err(|ioerror| A2lError::FileWriteError {
            filename: path.as_ref().to_path_buf(),
            ioerror,
        })?;

        Ok(())
    }

    #[cfg(feature = "check")]
    /// perform a consistency check on the data.
    #[must_use]
    pub fn check(&self) -> Vec<A2lError> {
        checker::check(&self.file)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Filename {
    // the full filename, which has been extended with a base path relative to the working directory
    full: OsString,
    // the "display" name, i.e. the name that appears in an /include directive or an error message
    display: String,
}

impl Filename {
    pub(crate) fn new(full: OsString, display: &str) -> Self {
        Self {
            full,
            display: display.to_string(),
        }
    }
}

impl From<&str> for Filename {
    fn from(value: &str) -> Self {
        Self {
            full: OsString::from(value),
            display: String::from(value),
        }
    }
}

impl From<&Path> for Filename {
    fn from(value: &Path) -> Self {
        Self {
            display: value.to_string_lossy().to_string(),
            full: OsString::from(value),
        }
    }
}

impl From<OsString> for Filename {
    fn from(value: OsString) -> Self {
        Self {
            display: value.to_string_lossy().to_string(),
            full: value,
        }
    }
}

impl Display for Filename {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn load_empty_file() {
        let result = load_from_string("");
        assert!(result.is_err());
        let error = result.unwrap_err();
        assert!(matches!(error, A2lError::EmptyFileError { .. }));

        // only comments is also empty
        let result = load_from_string("/* nothing */ // here");
        assert!(matches!(result, Err(A2lError::EmptyFileError { .. })));
    }

    #[test]
    fn test_load_file() {
        let dir = tempdir().unwrap();

        // create a file in a temp directory and load it
        let path = dir.path().join("test.a2l");
        let path = path.to_str().unwrap();

        let text = r#"
            ASAP2_VERSION 1 71
            /begin PROJECT new_project ""
                /begin MODULE new_module ""
                /end MODULE
            /end PROJECT
        "#;
        std::fs::write(path, text).unwrap();

        let (a2l, log_msgs) = load(path).unwrap();
        assert!(log_msgs.is_empty());
        assert_eq!(a2l.file.project.module[0].name, "new_module");

        // try to load a file that does not exist
        let nonexistent_path = dir.path().join("nonexistent.a2l");
        let nonexistent_path = nonexistent_path.to_str().unwrap();
        let result = load(nonexistent_path);
        assert!(matches!(result, Err(A2lError::FileOpenError { .. })));
    }

    #[test]
    fn new_document() {
        let a2l = new();
        let text = a2l.write_to_string().unwrap();
        assert_eq!(
            text,
            "ASAP2_VERSION 1 71\n/begin PROJECT new_project \"\"\n  /begin MODULE new_module \"\"\n  /end MODULE\n/end PROJECT\n"
        );

        // the text of a new document can be loaded again and results in an equal file
        let (loaded, log_msgs) = load_from_string(&text).unwrap();
        assert!(log_msgs.is_empty());
        assert_eq!(loaded.file, a2l.file);
    }

    #[test]
    fn missing_version() {
        let (a2l, log_msgs) =
            load_from_string(r#"/begin PROJECT x "" /begin MODULE y "" /end MODULE /end PROJECT"#)
                .unwrap();
        assert!(a2l.file.asap2_version.is_none());
        assert_eq!(log_msgs.len(), 1);
    }

    #[test]
    fn additional_tokens() {
        let result = load_from_string(
            r#"ASAP2_VERSION 1 71 /begin PROJECT x "" /begin MODULE y "" /end MODULE /end PROJECT /end MODULE"#,
        );
        assert!(matches!(
            result,
            Err(A2lError::DecodeError {
                decode_error: DecodeError::AdditionalTokensError { .. }
            })
        ));

        // an identifier after the project is an unknown keyword of the file
        let result = load_from_string(
            r#"ASAP2_VERSION 1 71 /begin PROJECT x "" /begin MODULE y "" /end MODULE /end PROJECT abcdef"#,
        );
        assert!(matches!(
            result,
            Err(A2lError::DecodeError {
                decode_error: DecodeError::UnknownSubBlock { .. }
            })
        ));
    }

    #[test]
    fn write_nonexistent_file() {
        let a2l = new();
        let result = a2l.write(
            "__NONEXISTENT__/__FILE__/__PATH__/test.a2l",
            Some("test case write_nonexistent_file()"),
        );
        assert!(matches!(result, Err(A2lError::FileWriteError { .. })));
    }

    #[test]
    fn write_with_banner() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.a2l");
        let path = path.to_str().unwrap();

        let a2l = new();
        let result = a2l.write(path, Some("test case write_with_banner()"));
        assert!(result.is_ok());
        let file_text = String::from_utf8(std::fs::read(path).unwrap()).unwrap();
        assert!(file_text.starts_with("/* test case write_with_banner() */\nASAP2_VERSION 1 71\n"));

        // the banner is a comment, so the file can be loaded again
        let (loaded, _) = load(path).unwrap();
        assert_eq!(loaded.file, a2l.file);
        std::fs::remove_file(path).unwrap();

        let result = a2l.write(path, None);
        assert!(result.is_ok());
        let file_text = String::from_utf8(std::fs::read(path).unwrap()).unwrap();
        assert!(file_text.starts_with("ASAP2_VERSION"));
    }

    #[test]
    fn test_load_fragment() {
        let mut context = BuildContext::new();
        let result = load_fragment::<Measurement>(
            r#"
            /begin MEASUREMENT measurement_name ""
                UBYTE CM.IDENTICAL 0 0 0 255
                ECU_ADDRESS 0x13A00
                FORMAT "%5.0"    /* Note: Overwrites the format stated in the computation method */
                DISPLAY_IDENTIFIER DI.ASAM.M.SCALAR.UBYTE.IDENTICAL    /* optional display identifier */
                /begin IF_DATA ETK  KP_BLOB 0x13A00 INTERN 1 RASTER 2 /end IF_DATA
            /end MEASUREMENT"#,
            &mut context,
        );
        let measurement = result.unwrap();
        assert_eq!(measurement.name, "measurement_name");
        assert_eq!(measurement.ecu_address.as_ref().unwrap().address, 0x13A00);
        assert_eq!(measurement.if_data.len(), 1);
        assert_eq!(measurement.if_data[0].get_name(), "ETK");

        // a simple node can be a fragment, too
        let bit_mask = load_fragment::<BitMask>("BIT_MASK 0x0F", &mut context).unwrap();
        assert_eq!(bit_mask.value, 15);

        // random data is not a valid fragment
        let result = load_fragment::<Measurement>("12345", &mut context);
        assert!(matches!(result, Err(A2lError::DecodeError { .. })));

        let result = load_fragment::<Measurement>(",,,", &mut context);
        assert!(matches!(result, Err(A2lError::TokenizerError { .. })));
    }

    #[test]
    fn test_encode_fragment() {
        let mut context = BuildContext::new();
        let bit_mask = BitMask::new(&mut context, 0x0F);
        let text = encode_fragment(&bit_mask, &EncodeOptions::default()).unwrap();
        assert_eq!(text, "BIT_MASK 0xF");

        let format = Format::new(&mut context, "%6.2".to_string());
        let text = encode_fragment(&format, &EncodeOptions::default()).unwrap();
        assert_eq!(text, "FORMAT \"%6.2\"");
    }

    #[cfg(feature = "check")]
    #[test]
    fn check_document() {
        let mut a2l = new();
        assert!(a2l.check().is_empty());

        let vtab = CompuVtab::new(
            &mut a2l.context,
            "vtab".to_string(),
            String::new(),
            ConversionType::TabVerb,
            1,
        );
        let _ = a2l.file.project.module[0].compu_vtab.push(vtab);
        assert_eq!(a2l.check().len(), 1);
    }

    #[test]
    fn test_filename() {
        let filename = Filename::from("test.a2l");
        assert_eq!(filename.to_string(), "test.a2l");

        let filename = Filename::from(OsString::from("test.a2l"));
        assert_eq!(filename.to_string(), "test.a2l");

        let filename = Filename::from(Path::new("test.a2l"));
        assert_eq!(filename.to_string(), "test.a2l");
    }
}
