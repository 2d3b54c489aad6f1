//! Cトークンへの精製
//!
//! 展開済みのPPトークンをCトークンに昇格する。識別子は予約語表と
//! 照合し、pp-number は型付き整数値として解釈し直す。改行トークン
//! はここで落ちる。

use crate::ctype::{FloatValue, IntegerType, IntegerValue};
use crate::error::{Result, TokenError};
use crate::intern::{InternedStr, StringInterner};
use crate::number;
use crate::pptoken::{PPToken, PPTokenKind};
use crate::punct::Punct;
use crate::source::SliceSource;

/// Cトークン
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// 整数リテラル
    IntegerLit(IntegerValue),
    /// 浮動小数点リテラル（変換は未実装で、生成されない）
    FloatLit(FloatValue),
    /// 文字列リテラル（デコード済みバイト列）
    Str(Vec<u8>),
    /// ヘッダー名
    HeaderName(String),
    /// 識別子
    Ident(InternedStr),

    // 予約語
    Auto,
    Bool,
    Break,
    Case,
    Char,
    Complex,
    Const,
    Continue,
    Default,
    Do,
    Double,
    Else,
    Enum,
    Extern,
    Float,
    For,
    Goto,
    If,
    Imaginary,
    Inline,
    Int,
    Long,
    Register,
    Restrict,
    Return,
    Short,
    Signed,
    Sizeof,
    Static,
    Struct,
    Switch,
    Typedef,
    Union,
    Unsigned,
    Void,
    Volatile,
    While,

    /// 区切り子
    Punct(Punct),
    /// ストリーム終端
    Eof,
}

impl Token {
    /// 予約語表
    pub fn from_keyword(s: &str) -> Option<Token> {
        match s {
            "auto" => Some(Token::Auto),
            "_Bool" => Some(Token::Bool),
            "break" => Some(Token::Break),
            "case" => Some(Token::Case),
            "char" => Some(Token::Char),
            "_Complex" => Some(Token::Complex),
            "const" => Some(Token::Const),
            "continue" => Some(Token::Continue),
            "default" => Some(Token::Default),
            "do" => Some(Token::Do),
            "double" => Some(Token::Double),
            "else" => Some(Token::Else),
            "enum" => Some(Token::Enum),
            "extern" => Some(Token::Extern),
            "float" => Some(Token::Float),
            "for" => Some(Token::For),
            "goto" => Some(Token::Goto),
            "if" => Some(Token::If),
            "_Imaginary" => Some(Token::Imaginary),
            "inline" => Some(Token::Inline),
            "int" => Some(Token::Int),
            "long" => Some(Token::Long),
            "register" => Some(Token::Register),
            "restrict" => Some(Token::Restrict),
            "return" => Some(Token::Return),
            "short" => Some(Token::Short),
            "signed" => Some(Token::Signed),
            "sizeof" => Some(Token::Sizeof),
            "static" => Some(Token::Static),
            "struct" => Some(Token::Struct),
            "switch" => Some(Token::Switch),
            "typedef" => Some(Token::Typedef),
            "union" => Some(Token::Union),
            "unsigned" => Some(Token::Unsigned),
            "void" => Some(Token::Void),
            "volatile" => Some(Token::Volatile),
            "while" => Some(Token::While),
            _ => None,
        }
    }

    /// 予約語ならそのスペリングを返す
    fn keyword_str(&self) -> Option<&'static str> {
        match self {
            Token::Auto => Some("auto"),
            Token::Bool => Some("_Bool"),
            Token::Break => Some("break"),
            Token::Case => Some("case"),
            Token::Char => Some("char"),
            Token::Complex => Some("_Complex"),
            Token::Const => Some("const"),
            Token::Continue => Some("continue"),
            Token::Default => Some("default"),
            Token::Do => Some("do"),
            Token::Double => Some("double"),
            Token::Else => Some("else"),
            Token::Enum => Some("enum"),
            Token::Extern => Some("extern"),
            Token::Float => Some("float"),
            Token::For => Some("for"),
            Token::Goto => Some("goto"),
            Token::If => Some("if"),
            Token::Imaginary => Some("_Imaginary"),
            Token::Inline => Some("inline"),
            Token::Int => Some("int"),
            Token::Long => Some("long"),
            Token::Register => Some("register"),
            Token::Restrict => Some("restrict"),
            Token::Return => Some("return"),
            Token::Short => Some("short"),
            Token::Signed => Some("signed"),
            Token::Sizeof => Some("sizeof"),
            Token::Static => Some("static"),
            Token::Struct => Some("struct"),
            Token::Switch => Some("switch"),
            Token::Typedef => Some("typedef"),
            Token::Union => Some("union"),
            Token::Unsigned => Some("unsigned"),
            Token::Void => Some("void"),
            Token::Volatile => Some("volatile"),
            Token::While => Some("while"),
            _ => None,
        }
    }

    /// PPトークンを1つのCトークンに変換する
    ///
    /// 改行は None（出力から落ちる）。Other と Param はこの段階
    /// まで届いたらエラー。
    pub fn from_pp(t: &PPToken, interner: &StringInterner) -> Result<Option<Token>> {
        match &t.kind {
            PPTokenKind::Newline => Ok(None),
            PPTokenKind::Ident(id) => {
                let name = interner.get(*id);
                Ok(Some(Token::from_keyword(name).unwrap_or(Token::Ident(*id))))
            }
            PPTokenKind::Number => {
                let mut src = SliceSource::new(t.raw.as_bytes());
                let value = number::read_integer(&mut src)?;
                if src.remaining() > 0 {
                    return Err(TokenError::InvalidToken(t.raw.clone()).into());
                }
                Ok(Some(Token::IntegerLit(value)))
            }
            PPTokenKind::CharConst(c) => Ok(Some(Token::IntegerLit(IntegerValue::new(
                IntegerType::Int,
                *c as i64,
            )))),
            PPTokenKind::Str(bytes) => Ok(Some(Token::Str(bytes.clone()))),
            PPTokenKind::HeaderName(path) => Ok(Some(Token::HeaderName(path.clone()))),
            PPTokenKind::Punct(p) => Ok(Some(Token::Punct(*p))),
            PPTokenKind::Eof => Ok(Some(Token::Eof)),
            PPTokenKind::Other | PPTokenKind::Param { .. } => {
                Err(TokenError::InvalidToken(t.raw.clone()).into())
            }
        }
    }

    /// 表示用文字列を取得
    pub fn format(&self, interner: &StringInterner) -> String {
        if let Some(kw) = self.keyword_str() {
            return kw.to_string();
        }
        match self {
            Token::IntegerLit(v) => format!("integer: {} ({})", v.value, v.ty),
            Token::FloatLit(v) => format!("float: {} ({})", v.value, v.ty),
            Token::Str(bytes) => {
                format!("string: {:?}", String::from_utf8_lossy(bytes))
            }
            Token::HeaderName(path) => format!("header-name: {:?}", path),
            Token::Ident(id) => format!("ident: {}", interner.get(*id)),
            Token::Punct(p) => p.as_str().to_string(),
            Token::Eof => "eof".to_string(),
            _ => String::new(),
        }
    }
}

/// 前処理済みのPPトークン列をCトークン列へ精製する
pub fn refine(tokens: &[PPToken], interner: &StringInterner) -> Result<Vec<Token>> {
    let mut out = Vec::new();
    for t in tokens {
        if let Some(token) = Token::from_pp(t, interner)? {
            out.push(token);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pp_ident(interner: &mut StringInterner, name: &str) -> PPToken {
        let id = interner.intern(name);
        PPToken::new(PPTokenKind::Ident(id), name)
    }

    #[test]
    fn test_keyword_lookup() {
        assert_eq!(Token::from_keyword("int"), Some(Token::Int));
        assert_eq!(Token::from_keyword("while"), Some(Token::While));
        assert_eq!(Token::from_keyword("typedef"), Some(Token::Typedef));
        // typeof は予約語ではない
        assert_eq!(Token::from_keyword("typeof"), None);
        assert_eq!(Token::from_keyword("foo"), None);
    }

    #[test]
    fn test_keyword_spelling() {
        let interner = StringInterner::new();
        assert_eq!(Token::For.format(&interner), "for");
        assert_eq!(Token::Bool.format(&interner), "_Bool");
    }

    #[test]
    fn test_ident_refinement() {
        let mut interner = StringInterner::new();
        let t = pp_ident(&mut interner, "main");
        let token = Token::from_pp(&t, &interner).unwrap().unwrap();
        assert_eq!(token.format(&interner), "ident: main");

        let t = pp_ident(&mut interner, "return");
        let token = Token::from_pp(&t, &interner).unwrap().unwrap();
        assert_eq!(token, Token::Return);
    }

    #[test]
    fn test_number_refinement() {
        let interner = StringInterner::new();
        let t = PPToken::new(PPTokenKind::Number, "0xffffffff");
        let token = Token::from_pp(&t, &interner).unwrap().unwrap();
        assert_eq!(
            token,
            Token::IntegerLit(IntegerValue::new(IntegerType::LongLong, 0xffff_ffff))
        );
    }

    #[test]
    fn test_number_with_leftover_is_error() {
        let interner = StringInterner::new();
        for raw in ["123abc", "08", "1lL", "0x1g1"] {
            let t = PPToken::new(PPTokenKind::Number, raw);
            assert!(Token::from_pp(&t, &interner).is_err(), "raw: {:?}", raw);
        }
    }

    #[test]
    fn test_char_constant_becomes_int() {
        let interner = StringInterner::new();
        let t = PPToken::new(PPTokenKind::CharConst(b'a'), "'a'");
        let token = Token::from_pp(&t, &interner).unwrap().unwrap();
        assert_eq!(
            token,
            Token::IntegerLit(IntegerValue::new(IntegerType::Int, 97))
        );
    }

    #[test]
    fn test_newline_dropped() {
        let interner = StringInterner::new();
        let t = PPToken::new(PPTokenKind::Newline, "\n");
        assert_eq!(Token::from_pp(&t, &interner).unwrap(), None);
    }

    #[test]
    fn test_other_is_error() {
        let interner = StringInterner::new();
        let t = PPToken::new(PPTokenKind::Other, "@@");
        let err = Token::from_pp(&t, &interner).unwrap_err();
        assert_eq!(err.to_string(), "token: invalid token: \"@@\"");
    }

    #[test]
    fn test_integer_format() {
        let interner = StringInterner::new();
        let token = Token::IntegerLit(IntegerValue::new(IntegerType::Int, 1));
        assert_eq!(token.format(&interner), "integer: 1 (int)");
    }

    #[test]
    fn test_string_format() {
        let interner = StringInterner::new();
        let token = Token::Str(b"Hello, World!\n".to_vec());
        assert_eq!(token.format(&interner), "string: \"Hello, World!\\n\"");
    }
}
