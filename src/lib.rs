//! C言語フロントエンドの前半（翻訳フェーズ1〜4）
//!
//! 生のソースバイト列からPPトークンを切り出し、#include /
//! #define / #undef / #error とマクロ展開（オブジェクト・関数・
//! 文字列化、hide-set 付き再走査）を実行し、Cトークンへ精製する。
//!
//! パイプラインは翻訳単位ごとに1本:
//! バイト列 → 論理バイト列 → PPトークン → 展開済みPPトークン → Cトークン
//! 各段は pull 型で、消費側が1トークンずつ進める。

pub mod concat;
pub mod ctype;
pub mod error;
pub mod files;
pub mod intern;
pub mod literal;
pub mod macro_def;
pub mod number;
pub mod pptoken;
pub mod preprocess;
pub mod punct;
pub mod source;
pub mod token;
pub mod tokenize;

// 主要な型を再エクスポート
pub use concat::StringConcatter;
pub use ctype::{FloatType, FloatValue, IntegerType, IntegerValue};
pub use error::{CompileError, LexError, PPError, Result, TokenError};
pub use files::{DirFileSet, FileSet, MemoryFileSet};
pub use intern::{InternedStr, StringInterner};
pub use macro_def::{MacroDef, MacroKind, MacroTable};
pub use pptoken::{PPToken, PPTokenKind};
pub use preprocess::{preprocess, PPTokenRead, Preprocessor};
pub use punct::Punct;
pub use source::{BufSource, ByteRead, SliceSource, Source};
pub use token::{refine, Token};
pub use tokenize::Tokenizer;

/// 1つの翻訳単位をCトークン列まで変換する
///
/// ルートファイルをトークン化・前処理（文字列連結を含む）し、
/// Cトークンへ精製して返す。識別子の解決に使ったインターナーも
/// 一緒に返す。
pub fn translate(files: &dyn FileSet, path: &str) -> Result<(Vec<Token>, StringInterner)> {
    let mut interner = StringInterner::new();
    let pp_tokens = preprocess::preprocess(files, path, &mut interner)?;
    let tokens = token::refine(&pp_tokens, &interner)?;
    Ok((tokens, interner))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_minimal() {
        let files = MemoryFileSet::from([("main.c", "int x = 42;")]);
        let (tokens, interner) = translate(&files, "main.c").unwrap();

        let formatted: Vec<_> = tokens.iter().map(|t| t.format(&interner)).collect();
        assert_eq!(
            formatted,
            vec!["int", "ident: x", "=", "integer: 42 (int)", ";"]
        );
    }

    #[test]
    fn test_translate_error_propagates() {
        let files = MemoryFileSet::from([("main.c", "#error stop here")]);
        let err = translate(&files, "main.c").unwrap_err();
        assert_eq!(err.to_string(), "preprocess: #error stop here");
    }
}
