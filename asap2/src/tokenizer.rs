use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::Filename;
use crate::loader;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TokenizerError {
    #[error("{filename}:{line}: Failed to load included file {incname}")]
    IncludeFileError {
        filename: String,
        line: u32,
        incname: String,
    },

    #[error("{filename}:{line}: File {incname} includes itself")]
    RecursiveIncludeError {
        filename: String,
        line: u32,
        incname: String,
    },

    #[error("{filename}:{line}: Include directive was not followed by a filename")]
    IncompleteIncludeError { filename: String, line: u32 },

    #[error("{filename}:{line}: Input text \"{tokentext}...\" was not recognized as an a2l token")]
    InvalidA2lToken {
        filename: String,
        line: u32,
        tokentext: String,
    },

    #[error("{filename}:{line}: Invalid numerical constant \"{tokentext}\"")]
    InvalidNumericalConstant {
        filename: String,
        line: u32,
        tokentext: String,
    },

    #[error("{filename}:{line}: Block comment was not closed before the end of input was reached")]
    UnclosedComment { filename: String, line: u32 },

    #[error("{filename}:{line}: String was not closed before the end of input was reached")]
    UnclosedString { filename: String, line: u32 },

    #[error("{filename}:{line}: There is no whitespace separating the input tokens")]
    MissingWhitespace { filename: String, line: u32 },
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum A2lTokenType {
    Identifier,
    Begin,
    End,
    Include,
    String,
    Number,
    /// the unparsed body of an A2ML or IF_DATA block
    Verbatim,
}

#[derive(Debug, Clone)]
pub struct A2lToken {
    pub ttype: A2lTokenType,
    pub startpos: usize,
    pub endpos: usize,
    pub fileid: usize,
    pub line: u32,
}

#[derive(Debug)]
pub(crate) struct TokenResult {
    pub(crate) tokens: Vec<A2lToken>,
    pub(crate) filedata: Vec<String>,
    pub(crate) filenames: Vec<Filename>,
}

// blocks whose content is not a2l and is carried through as one Verbatim token
const VERBATIM_BLOCKS: [&str; 2] = ["A2ML", "IF_DATA"];

// tokenize()
// Runs the actual tokenizer, then replaces each /include directive by the tokens of the included file
pub(crate) fn tokenize(
    filename: &Filename,
    fileid: usize,
    filetext: &str,
) -> Result<TokenResult, TokenizerError> {
    let mut include_stack = vec![include_key(&filename.full)];
    tokenize_file(filename, fileid, filetext, &mut include_stack)
}

// include_stack holds the files that are currently being tokenized, from the outermost inwards
fn tokenize_file(
    filename: &Filename,
    fileid: usize,
    filetext: &str,
    include_stack: &mut Vec<PathBuf>,
) -> Result<TokenResult, TokenizerError> {
    let mut filenames: Vec<Filename> = vec![filename.clone()];
    let mut filedata: Vec<String> = vec![filetext.to_owned()];
    let input_tokens = tokenize_core(&filename.to_string(), fileid, filetext)?;

    if input_tokens
        .iter()
        .all(|token| token.ttype != A2lTokenType::Include)
    {
        return Ok(TokenResult {
            tokens: input_tokens,
            filedata,
            filenames,
        });
    }

    let mut tokens = Vec::with_capacity(input_tokens.len());
    let mut next_fileid = fileid + 1;
    let mut token_iter = input_tokens.into_iter();
    while let Some(token) = token_iter.next() {
        if token.ttype != A2lTokenType::Include {
            tokens.push(token);
            continue;
        }

        let name_token = match token_iter.next() {
            Some(
                name_token @ A2lToken {
                    ttype: A2lTokenType::String | A2lTokenType::Identifier,
                    ..
                },
            ) => name_token,
            _ => {
                return Err(TokenizerError::IncompleteIncludeError {
                    filename: filename.to_string(),
                    line: token.line,
                });
            }
        };
        // the include name without surrounding quotes
        let incname = filetext[name_token.startpos..name_token.endpos].trim_matches('"');
        let incfilename = loader::make_include_filename(incname, &filenames[0].full);
        let inckey = include_key(&incfilename);
        if include_stack.contains(&inckey) {
            return Err(TokenizerError::RecursiveIncludeError {
                filename: filename.to_string(),
                line: name_token.line,
                incname: incname.to_owned(),
            });
        }
        let Ok(incfiledata) = loader::load(Path::new(&incfilename)) else {
            return Err(TokenizerError::IncludeFileError {
                filename: filename.to_string(),
                line: name_token.line,
                incname: incname.to_owned(),
            });
        };

        include_stack.push(inckey);
        let mut incresult = tokenize_file(
            &Filename::new(incfilename, incname),
            next_fileid,
            &incfiledata,
            include_stack,
        )?;
        include_stack.pop();
        next_fileid += incresult.filenames.len();
        tokens.append(&mut incresult.tokens);
        filenames.append(&mut incresult.filenames);
        filedata.append(&mut incresult.filedata);
    }

    Ok(TokenResult {
        tokens,
        filedata,
        filenames,
    })
}

// the same file can be reached through different relative paths
fn include_key(filename: &OsStr) -> PathBuf {
    let path = Path::new(filename);
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

// tokenize_core()
// Convert the text of an a2l file to tokens.
// The text is treated as ASCII during tokenization, even though it is actually UTF-8. Characters
// outside of basic ASCII can only occur in strings, comments and verbatim text, which are copied
// as a whole. Each token records its source line for error messages.
fn tokenize_core(
    filename: &str,
    fileid: usize,
    filetext: &str,
) -> Result<Vec<A2lToken>, TokenizerError> {
    let filebytes = filetext.as_bytes();
    let datalen = filebytes.len();

    let mut tokens: Vec<A2lToken> = Vec::with_capacity(datalen / 20);
    let mut bytepos = 0;
    let mut separated = true;
    let mut line = 1;

    let make_token = |ttype, startpos, endpos, line| A2lToken {
        ttype,
        startpos,
        endpos,
        fileid,
        line,
    };

    while bytepos < datalen {
        let startpos = bytepos;

        if filebytes[bytepos].is_ascii_whitespace() {
            separated = true;
            while bytepos < datalen && filebytes[bytepos].is_ascii_whitespace() {
                bytepos += 1;
            }
            line += count_newlines(&filebytes[startpos..bytepos]);
        } else if filebytes[bytepos] == b'/' && bytepos + 1 < datalen {
            bytepos += 1;
            if filebytes[bytepos] == b'*' {
                separated = true;
                bytepos = skip_block_comment(filebytes, bytepos + 1).ok_or_else(|| {
                    TokenizerError::UnclosedComment {
                        filename: filename.to_owned(),
                        line,
                    }
                })?;
                line += count_newlines(&filebytes[startpos..bytepos]);
            } else if filebytes[bytepos] == b'/' {
                separated = true;
                bytepos = skip_line_comment(filebytes, bytepos);
            } else {
                let ttype = if filebytes[bytepos..].starts_with(b"begin") {
                    bytepos += 5;
                    A2lTokenType::Begin
                } else if filebytes[bytepos..].starts_with(b"end") {
                    bytepos += 3;
                    A2lTokenType::End
                } else if filebytes[bytepos..].starts_with(b"include") {
                    bytepos += 7;
                    A2lTokenType::Include
                } else {
                    return Err(invalid_token(filename, line, filebytes, startpos));
                };
                separator_check(separated, filename, line)?;
                tokens.push(make_token(ttype, startpos, bytepos, line));
                separated = false;
            }
        } else if filebytes[bytepos] == b'"' {
            separator_check(separated, filename, line)?;
            let startline = line;
            bytepos = find_string_end(filebytes, bytepos + 1).ok_or_else(|| {
                TokenizerError::UnclosedString {
                    filename: filename.to_owned(),
                    line,
                }
            })?;
            line += count_newlines(&filebytes[startpos..bytepos]);
            tokens.push(make_token(A2lTokenType::String, startpos, bytepos, startline));
            separated = false;
        } else if tokens
            .last()
            .is_some_and(|tok| tok.ttype == A2lTokenType::Include)
            && is_pathchar(filebytes[bytepos])
        {
            // an unquoted file path
            separator_check(separated, filename, line)?;
            while bytepos < datalen && is_pathchar(filebytes[bytepos]) {
                bytepos += 1;
            }
            tokens.push(make_token(A2lTokenType::Identifier, startpos, bytepos, line));
            separated = false;
        } else if !filebytes[bytepos].is_ascii_digit() && is_identchar(filebytes[bytepos]) {
            separator_check(separated, filename, line)?;
            while bytepos < datalen && is_identchar(filebytes[bytepos]) {
                bytepos += 1;
            }
            tokens.push(make_token(A2lTokenType::Identifier, startpos, bytepos, line));
            separated = false;

            let is_block_start = tokens.len() >= 2
                && tokens[tokens.len() - 2].ttype == A2lTokenType::Begin
                && VERBATIM_BLOCKS.contains(&&filetext[startpos..bytepos]);
            if is_block_start {
                let (body_start, body_end, body_line, end_line) =
                    scan_verbatim_body(filebytes, bytepos, line);
                tokens.push(make_token(
                    A2lTokenType::Verbatim,
                    body_start,
                    body_end,
                    body_line,
                ));
                // resume at the trailing whitespace of the body
                bytepos = body_end.max(bytepos);
                line = end_line;
                separated = true;
            }
        } else if filebytes[bytepos] == b'-' || is_numchar(filebytes[bytepos]) {
            // a number, in any format (integer, floating point or hexadecimal)
            separator_check(separated, filename, line)?;
            bytepos += 1;
            while bytepos < datalen && is_numchar(filebytes[bytepos]) {
                bytepos += 1;
            }
            if bytepos < datalen && is_identchar(filebytes[bytepos]) {
                // an identifier that starts with a digit; the decoder rejects it with a precise message
                while bytepos < datalen && is_identchar(filebytes[bytepos]) {
                    bytepos += 1;
                }
                tokens.push(make_token(A2lTokenType::Identifier, startpos, bytepos, line));
            } else {
                let number = &filetext[startpos..bytepos];
                if number == "-" || number == "0x" || number == "0X" {
                    return Err(TokenizerError::InvalidNumericalConstant {
                        filename: filename.to_owned(),
                        line,
                        tokentext: number.to_owned(),
                    });
                }
                tokens.push(make_token(A2lTokenType::Number, startpos, bytepos, line));
            }
            separated = false;
        } else {
            return Err(invalid_token(filename, line, filebytes, startpos));
        }
    }

    Ok(tokens)
}

// scan_verbatim_body()
// The content of A2ML and IF_DATA blocks can't be tokenized according to the rules for A2L.
// Find the /end that closes the block and return the trimmed body, its first line and the line
// on which the scan stopped.
fn scan_verbatim_body(filebytes: &[u8], bytepos: usize, line: u32) -> (usize, usize, u32, u32) {
    let (end, _) = find_verbatim_end(filebytes, bytepos);
    let body = &filebytes[bytepos..end];

    let leading = body
        .iter()
        .take_while(|byte| byte.is_ascii_whitespace())
        .count();
    let trailing = body[leading..]
        .iter()
        .rev()
        .take_while(|byte| byte.is_ascii_whitespace())
        .count();
    let body_start = bytepos + leading;
    let body_end = end - trailing;

    let body_line = line + count_newlines(&filebytes[bytepos..body_start]);
    let end_line = line + count_newlines(&filebytes[bytepos..body_end]);
    (body_start, body_end, body_line, end_line)
}

// find_verbatim_end()
// Locate the /end that terminates a verbatim body. Nested /begin ... /end pairs (IF_DATA) are
// skipped, as are comments and strings. Returns the position of the terminating /end, or the end
// of the data together with false if there is none.
fn find_verbatim_end(filebytes: &[u8], mut bytepos: usize) -> (usize, bool) {
    let datalen = filebytes.len();
    let mut depth = 0usize;

    while bytepos < datalen {
        let rest = &filebytes[bytepos..];
        if rest.starts_with(b"//") {
            bytepos = skip_line_comment(filebytes, bytepos + 1);
        } else if rest.starts_with(b"/*") {
            bytepos = skip_block_comment(filebytes, bytepos + 2).unwrap_or(datalen);
        } else if rest[0] == b'"' {
            bytepos = find_string_end(filebytes, bytepos + 1).unwrap_or(datalen);
        } else if rest.starts_with(b"/begin") {
            depth += 1;
            bytepos += 6;
        } else if rest.starts_with(b"/end") {
            if depth == 0 {
                return (bytepos, true);
            }
            depth -= 1;
            bytepos += 4;
        } else {
            bytepos += 1;
        }
    }

    (datalen, false)
}

/// check that verbatim text can be written as the body of a block and read back unchanged
///
/// The text must not contain an unbalanced `/end` or `/begin`, or an unclosed string or comment.
/// Leading and trailing whitespace is not allowed either, since the body is trimmed when it is read.
pub(crate) fn is_valid_verbatim(text: &str) -> bool {
    if text.trim_matches(|c: char| c.is_ascii_whitespace()) != text {
        return false;
    }
    let terminated = format!("{text}\n/end");
    find_verbatim_end(terminated.as_bytes(), 0) == (text.len() + 1, true)
}

fn invalid_token(filename: &str, line: u32, filebytes: &[u8], startpos: usize) -> TokenizerError {
    let endpos = (startpos + 10).min(filebytes.len());
    TokenizerError::InvalidA2lToken {
        filename: filename.to_owned(),
        line,
        tokentext: String::from_utf8_lossy(&filebytes[startpos..endpos]).into(),
    }
}

// skip_line_comment()
// bytepos points at the second '/' of the comment marker; returns the position of the newline
fn skip_line_comment(filebytes: &[u8], bytepos: usize) -> usize {
    filebytes[bytepos..]
        .iter()
        .position(|byte| *byte == b'\n')
        .map_or(filebytes.len(), |offset| bytepos + offset)
}

// skip_block_comment()
// bytepos points at the first byte after "/*"; returns the first byte position after the comment
fn skip_block_comment(filebytes: &[u8], bytepos: usize) -> Option<usize> {
    filebytes
        .get(bytepos..)?
        .windows(2)
        .position(|pair| pair == b"*/")
        .map(|offset| bytepos + offset + 2)
}

// find_string_end()
// bytepos points at the first byte after the opening quote. Quotes can be escaped as "" or \",
// returns the first byte position after the closing quote
fn find_string_end(filebytes: &[u8], mut bytepos: usize) -> Option<usize> {
    let datalen = filebytes.len();
    while bytepos < datalen {
        match filebytes[bytepos] {
            b'\\' => bytepos += 2,
            b'"' => {
                if bytepos + 1 < datalen && filebytes[bytepos + 1] == b'"' {
                    // "" inside a string is an escaped quote
                    bytepos += 2;
                } else {
                    return Some(bytepos + 1);
                }
            }
            _ => bytepos += 1,
        }
    }
    None
}

// separator_check
// generate an error message if there is no whitespace (or a block comment) separating two tokens
fn separator_check(separated: bool, filename: &str, line: u32) -> Result<(), TokenizerError> {
    if !separated {
        return Err(TokenizerError::MissingWhitespace {
            filename: filename.to_owned(),
            line,
        });
    }
    Ok(())
}

// count_newlines()
// count the number of newlines in a comment or string. This is needed to keep the line count accurate
fn count_newlines(text: &[u8]) -> u32 {
    text.iter().map(|c| u32::from(*c == b'\n')).sum()
}

// is_pathchar()
// is this char allowed in a file path, extension of is_identchar()
fn is_pathchar(c: u8) -> bool {
    is_identchar(c) || c == b'\\' || c == b'/' || c == b'-'
}

// is_identchar()
// is this char allowed in an identifier
pub(crate) fn is_identchar(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'.' || c == b'[' || c == b']' || c == b'_'
}

// is_numchar()
// in addition to decimal format, numbers can also be written as hex, or as floats with exponents
fn is_numchar(c: u8) -> bool {
    c.is_ascii_hexdigit() || c == b'x' || c == b'X' || c == b'.' || c == b'+' || c == b'-'
}
