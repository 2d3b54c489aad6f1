//! PPトークナイザ
//!
//! 論理ソースストリームからPPトークンの遅延列を生成する。
//! ヘッダー名は #include ディレクティブの文脈でだけトークンに
//! なるため、直前のトークン列に応じた小さな状態機械を持つ。

use crate::error::{LexError, Result};
use crate::intern::StringInterner;
use crate::literal::{self, is_digit, is_nondigit, is_whitespace};
use crate::pptoken::{PPToken, PPTokenKind};
use crate::punct::Punct;
use crate::source::{BufSource, ByteRead, Source};

/// PPトークナイザ
pub struct Tokenizer {
    src: Source,
    /// ディレクティブ文脈の状態。
    /// -1: この行ではもうヘッダー名は現れない
    ///  0: 行頭（改行直後または初期状態）
    ///  1: ディレクティブ行の先頭（行頭の # の直後）
    ///  2: ヘッダー名が期待される位置（#include の直後）
    ppstate: i32,
    is_space: bool,
    was_space: bool,
}

impl Tokenizer {
    /// 新しいトークナイザを作成
    pub fn new(src: Source) -> Self {
        Self {
            src,
            ppstate: 0,
            is_space: false,
            was_space: false,
        }
    }

    /// ソースストリームへの参照（位置情報の取得用）
    pub fn source(&self) -> &Source {
        &self.src
    }

    /// 次のPPトークンを取得
    ///
    /// ストリーム終端では Eof トークンを返し続ける。
    pub fn next(&mut self, interner: &mut StringInterner) -> Result<PPToken> {
        let mut tok = loop {
            if let Some(t) = self.lex_one(interner)? {
                break t;
            }
        };
        tok.adjacent = !self.was_space;

        self.ppstate = match &tok.kind {
            PPTokenKind::Newline => 0,
            PPTokenKind::Punct(Punct::Hash) if self.ppstate == 0 => 1,
            PPTokenKind::Ident(_) if self.ppstate == 1 && tok.raw == "include" => 2,
            _ => -1,
        };

        Ok(tok)
    }

    /// 1トークン分の字句解析
    ///
    /// 空白・コメントを消費した場合は None を返す。
    fn lex_one(&mut self, interner: &mut StringInterner) -> Result<Option<PPToken>> {
        let (bs, n) = {
            let p = self.src.peek(3);
            let mut a = [0u8; 3];
            a[..p.len()].copy_from_slice(p);
            (a, p.len())
        };
        if n == 0 {
            return Ok(Some(PPToken::new(PPTokenKind::Eof, "")));
        }

        self.was_space = self.is_space;
        self.is_space = is_whitespace(bs[0]);

        let b1 = if n > 1 { Some(bs[1]) } else { None };
        let b2 = if n > 2 { Some(bs[2]) } else { None };

        let tok = match bs[0] {
            b'\n' => {
                self.src.discard(1);
                PPToken::new(PPTokenKind::Newline, "\n")
            }
            b' ' | b'\t' | 0x0B | 0x0C | b'\r' => {
                self.src.discard(1);
                return Ok(None);
            }
            b'/' => match b1 {
                Some(b'/') => {
                    self.skip_line_comment();
                    return Ok(None);
                }
                Some(b'*') => {
                    self.skip_block_comment()?;
                    return Ok(None);
                }
                Some(b'=') => self.punct(Punct::SlashEq),
                _ => self.punct(Punct::Slash),
            },
            b'+' => match b1 {
                Some(b'+') => self.punct(Punct::PlusPlus),
                Some(b'=') => self.punct(Punct::PlusEq),
                _ => self.punct(Punct::Plus),
            },
            b'-' => match b1 {
                Some(b'-') => self.punct(Punct::MinusMinus),
                Some(b'=') => self.punct(Punct::MinusEq),
                Some(b'>') => self.punct(Punct::Arrow),
                _ => self.punct(Punct::Minus),
            },
            b'*' => match b1 {
                Some(b'=') => self.punct(Punct::StarEq),
                _ => self.punct(Punct::Star),
            },
            b'%' => match b1 {
                Some(b'=') => self.punct(Punct::PercentEq),
                _ => self.punct(Punct::Percent),
            },
            b'=' => match b1 {
                Some(b'=') => self.punct(Punct::EqEq),
                _ => self.punct(Punct::Eq),
            },
            b'<' => {
                if self.header_name_expected() {
                    return Ok(Some(self.lex_header_name()?));
                }
                match (b1, b2) {
                    (Some(b'<'), Some(b'=')) => self.punct(Punct::LtLtEq),
                    (Some(b'<'), _) => self.punct(Punct::LtLt),
                    (Some(b'='), _) => self.punct(Punct::LtEq),
                    _ => self.punct(Punct::Lt),
                }
            }
            b'>' => match (b1, b2) {
                (Some(b'>'), Some(b'=')) => self.punct(Punct::GtGtEq),
                (Some(b'>'), _) => self.punct(Punct::GtGt),
                (Some(b'='), _) => self.punct(Punct::GtEq),
                _ => self.punct(Punct::Gt),
            },
            b'&' => match b1 {
                Some(b'&') => self.punct(Punct::AmpAmp),
                Some(b'=') => self.punct(Punct::AmpEq),
                _ => self.punct(Punct::Amp),
            },
            b'|' => match b1 {
                Some(b'|') => self.punct(Punct::PipePipe),
                Some(b'=') => self.punct(Punct::PipeEq),
                _ => self.punct(Punct::Pipe),
            },
            b'!' => match b1 {
                Some(b'=') => self.punct(Punct::BangEq),
                _ => self.punct(Punct::Bang),
            },
            b'^' => match b1 {
                Some(b'=') => self.punct(Punct::CaretEq),
                _ => self.punct(Punct::Caret),
            },
            b'\'' => return Ok(Some(self.lex_char()?)),
            b'"' => {
                if self.header_name_expected() {
                    return Ok(Some(self.lex_header_name()?));
                }
                return Ok(Some(self.lex_string()?));
            }
            b'.' => {
                if b1 == Some(b'.') && b2 == Some(b'.') {
                    self.punct(Punct::Ellipsis)
                } else if b1.is_some_and(is_digit) {
                    return Ok(Some(self.lex_pp_number()?));
                } else {
                    self.punct(Punct::Dot)
                }
            }
            b'0'..=b'9' => return Ok(Some(self.lex_pp_number()?)),
            b'#' => match b1 {
                Some(b'#') => self.punct(Punct::HashHash),
                _ => self.punct(Punct::Hash),
            },
            b'~' => self.punct(Punct::Tilde),
            b'?' => self.punct(Punct::Question),
            b':' => self.punct(Punct::Colon),
            b';' => self.punct(Punct::Semi),
            b',' => self.punct(Punct::Comma),
            b'(' => self.punct(Punct::LParen),
            b')' => self.punct(Punct::RParen),
            b'[' => self.punct(Punct::LBracket),
            b']' => self.punct(Punct::RBracket),
            b'{' => self.punct(Punct::LBrace),
            b'}' => self.punct(Punct::RBrace),
            c if is_nondigit(c) => {
                let name = literal::read_identifier(&mut self.src)?;
                let id = interner.intern(&name);
                PPToken::new(PPTokenKind::Ident(id), name)
            }
            _ => self.lex_other(),
        };
        Ok(Some(tok))
    }

    fn header_name_expected(&self) -> bool {
        self.ppstate == 2
    }

    /// 区切り子を消費してトークンにする
    fn punct(&mut self, p: Punct) -> PPToken {
        self.src.discard(p.as_str().len());
        PPToken::punct(p)
    }

    /// 行コメントを読み飛ばす（改行は消費しない）
    fn skip_line_comment(&mut self) {
        self.src.discard(2);
        while let Some(b) = self.src.peek_byte() {
            if b == b'\n' {
                break;
            }
            self.src.discard(1);
        }
    }

    /// ブロックコメントを終端の */ まで読み飛ばす
    fn skip_block_comment(&mut self) -> Result<()> {
        self.src.discard(2);
        loop {
            let (b0, b1) = {
                let p = self.src.peek(2);
                (p.first().copied(), p.get(1).copied())
            };
            if b1.is_none() {
                return Err(LexError::UnclosedBlockComment.into());
            }
            if b0 == Some(b'*') && b1 == Some(b'/') {
                self.src.discard(2);
                return Ok(());
            }
            self.src.discard(1);
        }
    }

    fn lex_header_name(&mut self) -> Result<PPToken> {
        let mut buf = BufSource::new(&mut self.src);
        let val = literal::read_header_name(&mut buf)?;
        let raw = buf.into_raw();
        Ok(PPToken::new(PPTokenKind::HeaderName(val), raw))
    }

    fn lex_char(&mut self) -> Result<PPToken> {
        let mut buf = BufSource::new(&mut self.src);
        let val = literal::read_char(&mut buf)?;
        let raw = buf.into_raw();
        Ok(PPToken::new(PPTokenKind::CharConst(val), raw))
    }

    fn lex_string(&mut self) -> Result<PPToken> {
        let mut buf = BufSource::new(&mut self.src);
        let val = literal::read_string(&mut buf)?;
        let raw = buf.into_raw();
        Ok(PPToken::new(PPTokenKind::Str(val), raw))
    }

    fn lex_pp_number(&mut self) -> Result<PPToken> {
        let spelling = literal::read_pp_number(&mut self.src)?;
        Ok(PPToken::new(PPTokenKind::Number, spelling))
    }

    /// 既知のどのカテゴリにも属さないバイトの並びを1トークンにまとめる
    fn lex_other(&mut self) -> PPToken {
        let mut val = Vec::new();
        while let Some(b) = self.src.peek_byte() {
            if Punct::is_single_byte_punct(b)
                || is_digit(b)
                || is_nondigit(b)
                || is_whitespace(b)
            {
                break;
            }
            self.src.discard(1);
            val.push(b);
        }
        let text = String::from_utf8_lossy(&val).into_owned();
        PPToken::new(PPTokenKind::Other, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(src: &str) -> Vec<String> {
        let mut interner = StringInterner::new();
        let mut tokenizer = Tokenizer::new(Source::new(src.as_bytes(), "test.c"));
        let mut out = Vec::new();
        loop {
            let tok = tokenizer.next(&mut interner).unwrap();
            if tok.is_eof() {
                break;
            }
            out.push(tok.to_string());
        }
        out
    }

    #[test]
    fn test_empty() {
        // 空入力にも正規化で改行が1つ補われる
        assert_eq!(lex(""), vec!["(\\n)"]);
    }

    #[test]
    fn test_hash_and_hashhash() {
        assert_eq!(lex("#"), vec!["#", "(\\n)"]);
        assert_eq!(lex("##"), vec!["##", "(\\n)"]);
    }

    #[test]
    fn test_unknown_tokens() {
        assert_eq!(lex("@@ @@@"), vec!["@@", "@@@", "(\\n)"]);
    }

    #[test]
    fn test_backslash_is_other() {
        assert_eq!(lex("\\"), vec!["\\", "(\\n)"]);
    }

    #[test]
    fn test_calc() {
        assert_eq!(lex("1+1=2"), vec!["1", "+", "1", "=", "2", "(\\n)"]);
    }

    #[test]
    fn test_adjacent_strings() {
        assert_eq!(lex(r#""a""b""c""#), vec![r#""a""#, r#""b""#, r#""c""#, "(\\n)"]);
    }

    #[test]
    fn test_hello_world() {
        let src = "int main() {\n  printf(\"Hello, World!\\n\");\n  return 0;\n}";
        assert_eq!(
            lex(src),
            vec![
                "int", "main", "(", ")", "{", "(\\n)",
                "printf", "(", "\"Hello, World!\\n\"", ")", ";", "(\\n)",
                "return", "0", ";", "(\\n)",
                "}", "(\\n)",
            ]
        );
    }

    #[test]
    fn test_line_splicing() {
        assert_eq!(lex("foo \\\nbar"), vec!["foo", "bar", "(\\n)"]);

        let src = "i\\\nf (\"foo\\\nbar\") el\\\nse\n\\\n";
        assert_eq!(lex(src), vec!["if", "(", "\"foobar\"", ")", "else", "(\\n)"]);
    }

    #[test]
    fn test_greedy_increment() {
        assert_eq!(lex("c+++++c"), vec!["c", "++", "++", "+", "c", "(\\n)"]);
    }

    #[test]
    fn test_line_comment() {
        let src = "int main() { // ABC\n  return 0;\n} // DEF";
        assert_eq!(
            lex(src),
            vec![
                "int", "main", "(", ")", "{", "(\\n)",
                "return", "0", ";", "(\\n)",
                "}", "(\\n)",
            ]
        );
    }

    #[test]
    fn test_block_comment() {
        let src = "int main() {\n  /*\n    hi\n  */\n  return /* hihi */ 0;\n}";
        assert_eq!(
            lex(src),
            vec![
                "int", "main", "(", ")", "{", "(\\n)", "(\\n)",
                "return", "0", ";", "(\\n)",
                "}", "(\\n)",
            ]
        );
    }

    #[test]
    fn test_comment_pathologies() {
        assert_eq!(
            lex("/**/*/*\"*/*/*\"//*//**/*/"),
            vec!["*", "*", "*", "/", "(\\n)"]
        );
    }

    #[test]
    fn test_unclosed_block_comment() {
        let mut interner = StringInterner::new();
        let mut tokenizer = Tokenizer::new(Source::new(b"/* never closed", "test.c"));
        assert!(tokenizer.next(&mut interner).is_err());
    }

    #[test]
    fn test_header_name_context() {
        let src = "#include <abc>\n# <abc>\n#foo <abc>\nabc <abc>\n#include \"abc\"\n\"abc\"";
        assert_eq!(
            lex(src),
            vec![
                "#", "include", "<abc>", "(\\n)",
                "#", "<", "abc", ">", "(\\n)",
                "#", "foo", "<", "abc", ">", "(\\n)",
                "abc", "<", "abc", ">", "(\\n)",
                "#", "include", "\"abc\"", "(\\n)",
                "\"abc\"", "(\\n)",
            ]
        );
    }

    #[test]
    fn test_header_name_with_backslash() {
        // ヘッダー名の中身は逐語的
        let src = "#include <ab\\c>\n#include \"ab\\c\"";
        assert_eq!(
            lex(src),
            vec![
                "#", "include", "<ab\\c>", "(\\n)",
                "#", "include", "\"ab\\c\"", "(\\n)",
            ]
        );
    }

    #[test]
    fn test_dot_forms() {
        assert_eq!(lex(".5 ... ."), vec![".5", "...", ".", "(\\n)"]);
    }

    #[test]
    fn test_adjacency_flags() {
        let mut interner = StringInterner::new();
        let mut tokenizer = Tokenizer::new(Source::new(b"a b+c", "test.c"));

        let a = tokenizer.next(&mut interner).unwrap();
        assert!(a.adjacent); // 先頭トークンに先行空白はない

        let b = tokenizer.next(&mut interner).unwrap();
        assert!(!b.adjacent);

        let plus = tokenizer.next(&mut interner).unwrap();
        assert!(plus.adjacent);

        let c = tokenizer.next(&mut interner).unwrap();
        assert!(c.adjacent);
    }

    #[test]
    fn test_char_constant() {
        let mut interner = StringInterner::new();
        let mut tokenizer = Tokenizer::new(Source::new(b"'a' '\\n'", "test.c"));

        let t = tokenizer.next(&mut interner).unwrap();
        assert_eq!(t.kind, PPTokenKind::CharConst(b'a'));
        assert_eq!(t.raw, "'a'");

        let t = tokenizer.next(&mut interner).unwrap();
        assert_eq!(t.kind, PPTokenKind::CharConst(b'\n'));
        assert_eq!(t.raw, "'\\n'");
    }

    #[test]
    fn test_string_value_decoded() {
        let mut interner = StringInterner::new();
        let mut tokenizer = Tokenizer::new(Source::new(b"\"a\\tb\"", "test.c"));

        let t = tokenizer.next(&mut interner).unwrap();
        assert_eq!(t.kind, PPTokenKind::Str(b"a\tb".to_vec()));
        assert_eq!(t.raw, "\"a\\tb\"");
    }

    #[test]
    fn test_eof_is_sticky() {
        let mut interner = StringInterner::new();
        let mut tokenizer = Tokenizer::new(Source::new(b"x", "test.c"));
        tokenizer.next(&mut interner).unwrap(); // x
        tokenizer.next(&mut interner).unwrap(); // 改行
        assert!(tokenizer.next(&mut interner).unwrap().is_eof());
        assert!(tokenizer.next(&mut interner).unwrap().is_eof());
    }
}
