use crate::A2lError;
use std::ffi::{OsStr, OsString};
use std::fs::File;
use std::io::Read;
use std::path::{MAIN_SEPARATOR, Path};

// resolve the name given in an /include directive relative to the directory of the including file
pub(crate) fn make_include_filename(incname: &str, base_filename: &OsStr) -> OsString {
    let separator = MAIN_SEPARATOR.to_string();
    let normalized_incname = incname.replace(['\\', '/'], &separator);
    let inc_path = Path::new(&normalized_incname);

    if inc_path.is_absolute() {
        return OsString::from(inc_path);
    }

    if let Some(basedir) = Path::new(base_filename).parent() {
        let joined = basedir.join(inc_path);
        if joined.exists() {
            return joined.into_os_string();
        }
    }

    OsString::from(normalized_incname)
}

/// read a file and convert its content to a String
///
/// UTF-8, UTF-16 and UTF-32 are detected with or without a byte order mark; data that is not
/// valid in any of these encodings is read as ISO 8859-1.
pub(crate) fn load(path: &Path) -> Result<String, A2lError> {
    let mut file = File::open(path).map_err(|ioerror| A2lError::FileOpenError {
        filename: path.to_path_buf(),
        ioerror,
    })?;

    let mut buffer = Vec::new();
    file.read_to_end(&mut buffer)
        .map_err(|ioerror| A2lError::FileReadError {
            filename: path.to_path_buf(),
            ioerror,
        })?;

    let text = decode_raw_bytes(&buffer);
    Ok(match text.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => text,
    })
}

// The first character of an a2l file is either a BOM or plain ASCII. UTF-16 and UTF-32 can
// therefore be recognized by the nul bytes in the first character.
fn decode_raw_bytes(filedata: &[u8]) -> String {
    if let Some(text) = decode_utf32(filedata) {
        return text;
    }
    if let Some(text) = decode_utf16(filedata) {
        return text;
    }
    match String::from_utf8(filedata.to_vec()) {
        Ok(text) => text,
        // every byte sequence is valid latin-1
        Err(_) => filedata.iter().map(|byte| char::from(*byte)).collect(),
    }
}

fn decode_utf32(filedata: &[u8]) -> Option<String> {
    if filedata.len() < 4 || filedata.len() % 4 != 0 {
        return None;
    }
    // BOM: 00 00 FE FF (BE) or FF FE 00 00 (LE); without a BOM: 00 00 00 xx or xx 00 00 00
    let conversion: fn([u8; 4]) -> u32 = if filedata[0] == 0 && filedata[1] == 0 && filedata[3] != 0
    {
        u32::from_be_bytes
    } else if filedata[0] != 0 && filedata[2] == 0 && filedata[3] == 0 {
        u32::from_le_bytes
    } else {
        return None;
    };

    filedata
        .chunks_exact(4)
        .map(|chunk| char::from_u32(conversion([chunk[0], chunk[1], chunk[2], chunk[3]])))
        .collect()
}

fn decode_utf16(filedata: &[u8]) -> Option<String> {
    if filedata.len() < 2 || filedata.len() % 2 != 0 {
        return None;
    }
    let (first, second) = (filedata[0], filedata[1]);
    let conversion: fn([u8; 2]) -> u16 =
        if (first == 0 && second != 0) || (first == 0xfe && second == 0xff) {
            u16::from_be_bytes
        } else if (first != 0 && second == 0) || (first == 0xff && second == 0xfe) {
            u16::from_le_bytes
        } else {
            return None;
        };

    let units: Vec<u16> = filedata
        .chunks_exact(2)
        .map(|chunk| conversion([chunk[0], chunk[1]]))
        .collect();
    String::from_utf16(&units).ok()
}
