//! 隣接文字列リテラルの連結
//!
//! 前処理が終わった後のPPトークン列に対して走る。マクロ展開を
//! 跨いで並んだ文字列リテラルもここで1つにまとまる。

use crate::error::Result;
use crate::pptoken::{PPToken, PPTokenKind};
use crate::preprocess::PPTokenRead;

/// 文字列リテラル連結フィルタ
///
/// 連続する文字列リテラルを、値はバイト連結・raw は空白1つで
/// 結合した1トークンに畳み込む。他のトークンは素通しする。
pub struct StringConcatter<R: PPTokenRead> {
    src: R,
    buf: Option<PPToken>,
}

impl<R: PPTokenRead> StringConcatter<R> {
    /// 新しい連結フィルタを作成
    pub fn new(src: R) -> Self {
        Self { src, buf: None }
    }
}

impl<R: PPTokenRead> PPTokenRead for StringConcatter<R> {
    fn next_pp_token(&mut self) -> Result<PPToken> {
        if let Some(t) = self.buf.take() {
            return Ok(t);
        }

        let mut first = self.src.next_pp_token()?;
        if !matches!(first.kind, PPTokenKind::Str(_)) {
            return Ok(first);
        }

        loop {
            let next = self.src.next_pp_token()?;
            if let PPTokenKind::Str(more) = &next.kind {
                if let PPTokenKind::Str(bytes) = &mut first.kind {
                    bytes.extend_from_slice(more);
                }
                if first.raw.is_empty() {
                    first.raw.push_str(&next.raw);
                } else {
                    first.raw.push(' ');
                    first.raw.push_str(&next.raw);
                }
            } else {
                self.buf = Some(next);
                return Ok(first);
            }
        }
    }
}
