//! 文字・リテラルリーダー
//!
//! peek可能なバイトソースからエスケープシーケンス・文字定数・
//! 文字列リテラル・ヘッダー名・pp-number・識別子を切り出す共有
//! プリミティブ。読み終えたときカーソルはリテラルの直後にある。

use crate::error::{CompileError, LexError, Result};
use crate::source::ByteRead;

/// 空白文字かどうか
pub fn is_whitespace(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | 0x0B | 0x0C | b'\r' | b'\n')
}

/// 数字かどうか
pub fn is_digit(c: u8) -> bool {
    c.is_ascii_digit()
}

/// nondigit（識別子の先頭に使える文字）かどうか
pub fn is_nondigit(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

fn next_byte<R: ByteRead>(src: &mut R) -> Result<u8> {
    src.read_byte()
        .ok_or_else(|| LexError::UnexpectedEof.into())
}

fn expect_byte<R: ByteRead>(src: &mut R, expected: u8) -> Result<()> {
    let b = next_byte(src)?;
    if b != expected {
        return Err(LexError::Expected { expected, found: b }.into());
    }
    Ok(())
}

fn hex_value(c: u8) -> u8 {
    match c {
        b'0'..=b'9' => c - b'0',
        b'a'..=b'f' => c - b'a' + 10,
        b'A'..=b'F' => c - b'A' + 10,
        _ => 0,
    }
}

/// エスケープシーケンスを読む
///
/// カーソルは先頭の `\` を指している。`\xHH` は16進数字ちょうど
/// 2桁、8進は貪欲に最大3桁（255超えはエラー）。`\u`/`\U` は認識
/// するが未実装として失敗する。
pub fn read_escaped_char<R: ByteRead>(src: &mut R) -> Result<u8> {
    expect_byte(src, b'\\')?;
    let b = next_byte(src)?;
    match b {
        b'a' => Ok(0x07),
        b'b' => Ok(0x08),
        b'f' => Ok(0x0C),
        b'n' => Ok(b'\n'),
        b'r' => Ok(b'\r'),
        b't' => Ok(b'\t'),
        b'v' => Ok(0x0B),
        b'\\' | b'\'' | b'"' | b'?' => Ok(b),
        b'x' => {
            let pair = {
                let p = src.peek(2);
                if p.len() < 2 {
                    None
                } else {
                    Some((p[0], p[1]))
                }
            };
            let Some((h0, h1)) = pair else {
                return Err(LexError::UnexpectedEof.into());
            };
            if !h0.is_ascii_hexdigit() {
                return Err(LexError::NonHexEscape(h0).into());
            }
            if !h1.is_ascii_hexdigit() {
                return Err(LexError::NonHexEscape(h1).into());
            }
            src.discard(2);
            Ok((hex_value(h0) << 4) | hex_value(h1))
        }
        b'0'..=b'7' => {
            let mut value = (b - b'0') as u32;
            for _ in 0..2 {
                match src.peek_byte() {
                    Some(c @ b'0'..=b'7') => {
                        src.discard(1);
                        value = value * 8 + (c - b'0') as u32;
                    }
                    _ => break,
                }
            }
            if value > 255 {
                return Err(LexError::OctalEscapeOutOfRange(value).into());
            }
            Ok(value as u8)
        }
        b'u' | b'U' => Err(LexError::EscapeNotImplemented(b).into()),
        _ => Err(LexError::UnknownEscape(b).into()),
    }
}

/// 文字定数 `'C'` を読み、デコード済みの値を返す
///
/// 空の `''` と、エスケープされていない `'`・改行は失敗する。
pub fn read_char<R: ByteRead>(src: &mut R) -> Result<u8> {
    expect_byte(src, b'\'')?;
    let b = src
        .peek_byte()
        .ok_or_else(|| CompileError::from(LexError::UnexpectedEof))?;
    let v = match b {
        b'\'' => return Err(LexError::EmptyCharLit.into()),
        b'\r' | b'\n' => return Err(LexError::NewlineInChar.into()),
        b'\\' => read_escaped_char(src)?,
        _ => {
            src.discard(1);
            b
        }
    };
    expect_byte(src, b'\'')?;
    Ok(v)
}

/// 文字列リテラル `"…"` を読み、デコード済みのバイト列を返す
pub fn read_string<R: ByteRead>(src: &mut R) -> Result<Vec<u8>> {
    expect_byte(src, b'"')?;
    let mut bytes = Vec::new();
    loop {
        let b = src
            .peek_byte()
            .ok_or_else(|| CompileError::from(LexError::UnexpectedEof))?;
        match b {
            b'"' => {
                src.discard(1);
                return Ok(bytes);
            }
            b'\\' => bytes.push(read_escaped_char(src)?),
            b'\r' | b'\n' => return Err(LexError::NewlineInString.into()),
            _ => {
                src.discard(1);
                bytes.push(b);
            }
        }
    }
}

/// ヘッダー名 `<…>` または `"…"` を読む
///
/// 本体は逐語的（エスケープ処理なし）。改行が現れたらエラー。
pub fn read_header_name<R: ByteRead>(src: &mut R) -> Result<String> {
    let open = next_byte(src)?;
    let close = match open {
        b'<' => b'>',
        b'"' => b'"',
        _ => return Err(LexError::Expected { expected: b'<', found: open }.into()),
    };
    let mut bytes = Vec::new();
    loop {
        let b = next_byte(src)?;
        if b == close {
            return Ok(String::from_utf8_lossy(&bytes).into_owned());
        }
        if b == b'\n' {
            return Err(LexError::UnterminatedHeaderName.into());
        }
        bytes.push(b);
    }
}

/// pp-number を読む
///
/// 先頭は数字、または数字が続く `.`。以降は
/// `digit | . | nondigit` を貪欲に取り込み、`e E p P` の直後に
/// 限って `+`/`-` も取り込む。意味の検証はしない（精製側の仕事）。
pub fn read_pp_number<R: ByteRead>(src: &mut R) -> Result<String> {
    let b = next_byte(src)?;
    if b == b'.' {
        match src.peek_byte() {
            Some(c) if is_digit(c) => {}
            Some(c) => return Err(LexError::ExpectedDigit(c).into()),
            None => return Err(LexError::UnexpectedEof.into()),
        }
    } else if !is_digit(b) {
        return Err(LexError::ExpectedDigit(b).into());
    }

    let mut out = vec![b];
    loop {
        let Some(c) = src.peek_byte() else { break };
        if !is_digit(c) && c != b'.' && !is_nondigit(c) {
            break;
        }
        src.discard(1);
        out.push(c);

        if !matches!(c, b'e' | b'E' | b'p' | b'P') {
            continue;
        }
        if let Some(s @ (b'+' | b'-')) = src.peek_byte() {
            src.discard(1);
            out.push(s);
        }
    }
    Ok(String::from_utf8_lossy(&out).into_owned())
}

/// 識別子 `nondigit (digit | nondigit)*` を読む
pub fn read_identifier<R: ByteRead>(src: &mut R) -> Result<String> {
    let b = next_byte(src)?;
    if !is_nondigit(b) {
        return Err(LexError::ExpectedNondigit(b).into());
    }
    let mut out = vec![b];
    while let Some(c) = src.peek_byte() {
        if !is_digit(c) && !is_nondigit(c) {
            break;
        }
        src.discard(1);
        out.push(c);
    }
    Ok(String::from_utf8_lossy(&out).into_owned())
}
