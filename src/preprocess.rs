//! プリプロセッサ
//!
//! PPトークン列を消費し、ディレクティブの実行とマクロ展開を行って
//! 展開済みのPPトークン列を生成する。pull型で、next_token() の
//! 呼び出しごとに1トークンだけ前進する。
//!
//! マクロ展開の結果は置換バッファに積まれ、取り出すたびに再走査
//! （rescan）される。トークンごとの hide-set（expanded_from）が
//! 自己参照マクロの無限展開を抑止する。

use std::collections::{HashSet, VecDeque};

use crate::error::{CompileError, PPError, Result};
use crate::files::FileSet;
use crate::intern::{InternedStr, StringInterner};
use crate::literal;
use crate::macro_def::{MacroDef, MacroKind, MacroTable};
use crate::pptoken::{PPToken, PPTokenKind};
use crate::punct::Punct;
use crate::source::{SliceSource, Source};
use crate::tokenize::Tokenizer;

/// 展開済みPPトークンの供給源
pub trait PPTokenRead {
    /// 次のPPトークンを取得
    fn next_pp_token(&mut self) -> Result<PPToken>;
}

/// 1トークン先読み付きのPPトークンリーダー
///
/// 直前に返したトークンが改行だったか（行頭述語）も追跡する。
struct TokenBuffer {
    tokenizer: Tokenizer,
    peeked: Option<PPToken>,
    line_head: bool,
}

impl TokenBuffer {
    fn new(tokenizer: Tokenizer) -> Self {
        Self {
            tokenizer,
            peeked: None,
            line_head: true,
        }
    }

    fn next(&mut self, interner: &mut StringInterner) -> Result<PPToken> {
        let t = match self.peeked.take() {
            Some(t) => t,
            None => self.tokenizer.next(interner)?,
        };
        self.line_head = matches!(t.kind, PPTokenKind::Newline);
        Ok(t)
    }

    fn peek(&mut self, interner: &mut StringInterner) -> Result<&PPToken> {
        if self.peeked.is_none() {
            let t = self.tokenizer.next(interner)?;
            self.peeked = Some(t);
        }
        match &self.peeked {
            Some(t) => Ok(t),
            None => unreachable!(),
        }
    }

    /// 次に返すトークンが行頭にあるか
    fn at_line_head(&self) -> bool {
        self.line_head
    }
}

/// インクルード1段分の読み取り状態
struct Frame {
    path: String,
    reader: TokenBuffer,
}

/// プリプロセッサ
///
/// マクロテーブルはインクルードを跨いで共有される。visited は
/// 現在のインクルード連鎖上のパス集合で、降りるときに追加し
/// 戻るときに取り除く（連鎖単位の非循環性）。
pub struct Preprocessor<'a> {
    files: &'a dyn FileSet,
    interner: &'a mut StringInterner,
    macros: MacroTable,
    visited: HashSet<String>,
    frames: Vec<Frame>,
    /// 置換バッファ。マクロ展開の結果が再走査待ちで並ぶ。
    sub: VecDeque<PPToken>,
}

impl<'a> Preprocessor<'a> {
    /// ルートファイルを開いてプリプロセッサを作成
    pub fn new(
        files: &'a dyn FileSet,
        path: &str,
        interner: &'a mut StringInterner,
    ) -> Result<Self> {
        let mut pp = Self {
            files,
            interner,
            macros: MacroTable::new(),
            visited: HashSet::new(),
            frames: Vec::new(),
            sub: VecDeque::new(),
        };
        pp.push_file(path)?;
        Ok(pp)
    }

    /// マクロテーブルへの参照
    pub fn macros(&self) -> &MacroTable {
        &self.macros
    }

    /// ファイルを開いてインクルードスタックに積む
    ///
    /// 連鎖上にあるパスの再インクルードはエラー。存在確認よりも
    /// 先に循環を検出する。
    fn push_file(&mut self, path: &str) -> Result<()> {
        if self.visited.contains(path) {
            return Err(PPError::RecursiveInclude(path.to_string()).into());
        }
        let bytes = self.files.read_file(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CompileError::from(PPError::FileNotFound(path.to_string()))
            } else {
                CompileError::from(PPError::Io(path.to_string(), e.to_string()))
            }
        })?;
        self.visited.insert(path.to_string());
        let tokenizer = Tokenizer::new(Source::new(&bytes, path));
        self.frames.push(Frame {
            path: path.to_string(),
            reader: TokenBuffer::new(tokenizer),
        });
        Ok(())
    }

    /// 次の展開済みトークンを取得
    ///
    /// ストリーム終端では Eof トークンを返し続ける。
    pub fn next_token(&mut self) -> Result<PPToken> {
        loop {
            if let Some(t) = self.next_step()? {
                return Ok(t);
            }
        }
    }

    /// 1ステップ前進する。トークンを生まないステップ（ディレクティブ
    /// 実行・マクロ展開の設置）では None を返す。
    fn next_step(&mut self) -> Result<Option<PPToken>> {
        // 置換バッファが先。取り出すトークンは再走査の対象になる。
        if let Some(t) = self.sub.pop_front() {
            if let Some(id) = t.ident() {
                if !t.expanded_from.contains(&id) {
                    if let Some(def) = self.macros.get(id).cloned() {
                        let expansion = self.apply_macro(&def, &t.expanded_from, true)?;
                        for tok in expansion.into_iter().rev() {
                            self.sub.push_front(tok);
                        }
                        return Ok(None);
                    }
                }
            }
            return Ok(Some(t));
        }

        let (t, line_head) = self.next_raw()?;

        if t.is_eof() {
            return Ok(Some(t));
        }

        if let Some(id) = t.ident() {
            if !t.expanded_from.contains(&id) {
                if let Some(def) = self.macros.get(id).cloned() {
                    let expansion = self.apply_macro(&def, &t.expanded_from, false)?;
                    self.sub = expansion.into();
                    return Ok(None);
                }
            }
            return Ok(Some(t));
        }

        if matches!(t.kind, PPTokenKind::Punct(Punct::Hash)) && line_head {
            return self.process_directive();
        }

        Ok(Some(t))
    }

    /// 上流ソースから生のトークンを1つ取得（展開なし）
    ///
    /// 行頭述語も同時に返す。枯れたインクルードフレームはここで
    /// 取り除かれ、そのパスは visited から外れる。
    fn next_raw(&mut self) -> Result<(PPToken, bool)> {
        loop {
            let (t, line_head) = match self.frames.last_mut() {
                Some(frame) => {
                    let line_head = frame.reader.at_line_head();
                    (frame.reader.next(self.interner)?, line_head)
                }
                None => return Ok((PPToken::new(PPTokenKind::Eof, ""), false)),
            };
            if t.is_eof() && self.frames.len() > 1 {
                if let Some(frame) = self.frames.pop() {
                    self.visited.remove(&frame.path);
                }
                continue;
            }
            return Ok((t, line_head));
        }
    }

    /// 現在のフレームの次のトークンを覗く
    fn peek_from_source(&mut self) -> Result<&PPToken> {
        match self.frames.last_mut() {
            Some(frame) => frame.reader.peek(self.interner),
            None => Err(PPError::UnexpectedEof.into()),
        }
    }

    /// 行頭の # の直後から1つのディレクティブを処理する
    ///
    /// 空ディレクティブ（# の直後の改行）だけはトークン（その改行）
    /// を返す。それ以外はトークンを生まない。
    fn process_directive(&mut self) -> Result<Option<PPToken>> {
        let (t, _) = self.next_raw()?;
        match &t.kind {
            PPTokenKind::Newline => Ok(Some(t)),
            PPTokenKind::Ident(id) => {
                let name = self.interner.get(*id).to_string();
                match name.as_str() {
                    "define" => {
                        self.process_define()?;
                        Ok(None)
                    }
                    "undef" => {
                        self.process_undef()?;
                        Ok(None)
                    }
                    "include" => {
                        self.process_include()?;
                        Ok(None)
                    }
                    "error" => Err(self.process_error()),
                    "if" | "ifdef" | "ifndef" | "else" | "elif" | "endif" | "line"
                    | "pragma" => Err(PPError::NotImplemented(name.clone()).into()),
                    _ => Err(PPError::InvalidDirective(name.clone()).into()),
                }
            }
            _ => Err(PPError::Expected {
                expected: "identifier".to_string(),
                found: t.kind.describe(),
            }
            .into()),
        }
    }

    /// #define NAME [( params )] tokens...
    fn process_define(&mut self) -> Result<()> {
        let (name_tok, _) = self.next_raw()?;
        let Some(name) = name_tok.ident() else {
            return Err(PPError::Expected {
                expected: "identifier".to_string(),
                found: name_tok.kind.describe(),
            }
            .into());
        };

        // パラメータリストが始まるのはマクロ名に隣接した ( だけ
        let params = if self.peek_is_adjacent_lparen()? {
            self.next_raw()?;
            Some(self.parse_macro_params()?)
        } else {
            None
        };

        let mut body = Vec::new();
        loop {
            let (t, _) = self.next_raw()?;
            match t.kind {
                PPTokenKind::Newline | PPTokenKind::Eof => break,
                _ => body.push(t),
            }
        }

        let def = match params {
            Some(params) => {
                let body = rewrite_macro_body(body, &params)?;
                MacroDef::function(name, params, body)
            }
            None => MacroDef::object(name, body),
        };
        self.macros.define(def);
        Ok(())
    }

    fn peek_is_adjacent_lparen(&mut self) -> Result<bool> {
        let t = self.peek_from_source()?;
        Ok(matches!(t.kind, PPTokenKind::Punct(Punct::LParen)) && t.adjacent)
    }

    /// ( の直後から ) までのパラメータ名を読む
    fn parse_macro_params(&mut self) -> Result<Vec<InternedStr>> {
        let mut params = Vec::new();

        if matches!(
            self.peek_from_source()?.kind,
            PPTokenKind::Punct(Punct::RParen)
        ) {
            self.next_raw()?;
            return Ok(params);
        }

        loop {
            let (t, _) = self.next_raw()?;
            let Some(id) = t.ident() else {
                return Err(PPError::Expected {
                    expected: "identifier".to_string(),
                    found: t.kind.describe(),
                }
                .into());
            };
            params.push(id);

            let (t, _) = self.next_raw()?;
            match t.kind {
                PPTokenKind::Punct(Punct::RParen) => break,
                PPTokenKind::Punct(Punct::Comma) => continue,
                _ => {
                    return Err(PPError::Expected {
                        expected: "')' or ','".to_string(),
                        found: t.kind.describe(),
                    }
                    .into())
                }
            }
        }
        Ok(params)
    }

    /// #undef NAME
    fn process_undef(&mut self) -> Result<()> {
        let (t, _) = self.next_raw()?;
        let Some(id) = t.ident() else {
            return Err(PPError::Expected {
                expected: "identifier".to_string(),
                found: t.kind.describe(),
            }
            .into());
        };
        self.macros.undefine(id);

        // 名前の後は改行でなければならない
        let (t, _) = self.next_raw()?;
        if !matches!(t.kind, PPTokenKind::Newline) {
            return Err(PPError::Expected {
                expected: "new-line".to_string(),
                found: t.kind.describe(),
            }
            .into());
        }
        Ok(())
    }

    /// #include <path> / #include "path"
    fn process_include(&mut self) -> Result<()> {
        let (t, _) = self.next_raw()?;
        let path = match t.kind {
            PPTokenKind::HeaderName(path) => path,
            other => {
                return Err(PPError::Expected {
                    expected: "header-name".to_string(),
                    found: other.describe(),
                }
                .into())
            }
        };
        self.push_file(&path)
    }

    /// #error TOKENS... のメッセージを組み立てて返す
    fn process_error(&mut self) -> CompileError {
        let mut msg = String::new();
        loop {
            match self.next_raw() {
                Ok((t, _)) => match t.kind {
                    PPTokenKind::Newline | PPTokenKind::Eof => break,
                    _ => {
                        msg.push(' ');
                        msg.push_str(&t.to_string());
                    }
                },
                Err(e) => return e,
            }
        }
        PPError::ErrorDirective(msg).into()
    }

    /// マクロを呼び出し位置に適用し、展開列を返す
    ///
    /// from_sub が真なら関数マクロの引数は置換バッファの残りから
    /// 供給される（再走査時）。偽なら上流ソースから読む。
    fn apply_macro(
        &mut self,
        def: &MacroDef,
        call_hide: &HashSet<InternedStr>,
        from_sub: bool,
    ) -> Result<Vec<PPToken>> {
        let params_len = match &def.kind {
            MacroKind::Object => {
                let mut out = Vec::with_capacity(def.body.len());
                for t in &def.body {
                    out.push(inherit_hide_set(t.clone(), call_hide, def.name));
                }
                return Ok(out);
            }
            MacroKind::Function { params } => params.len(),
        };

        let t = self.next_expansion_token(from_sub)?;
        if !matches!(t.kind, PPTokenKind::Punct(Punct::LParen)) {
            return Err(PPError::Expected {
                expected: "(".to_string(),
                found: t.kind.describe(),
            }
            .into());
        }

        let args = self.collect_macro_args(from_sub)?;
        if args.len() != params_len {
            return Err(PPError::WrongArgCount {
                expected: params_len,
                got: args.len(),
            }
            .into());
        }

        let mut out = Vec::new();
        for t in &def.body {
            match t.kind {
                PPTokenKind::Param {
                    index,
                    stringify: false,
                } => {
                    // 引数のトークンは hide-set に手を付けずに差し込む。
                    // 再走査でさらに展開できなければならない。
                    out.extend(args[index].iter().cloned());
                }
                PPTokenKind::Param {
                    index,
                    stringify: true,
                } => out.push(stringify_arg(&args[index])?),
                _ => out.push(inherit_hide_set(t.clone(), call_hide, def.name)),
            }
        }
        Ok(out)
    }

    /// ( の直後から ) までのマクロ実引数を集める
    ///
    /// 引数は括弧深度0のコンマで区切られた（空でもよい）トークン列。
    fn collect_macro_args(&mut self, from_sub: bool) -> Result<Vec<Vec<PPToken>>> {
        let mut args = Vec::new();

        if self.peek_expansion_is_rparen(from_sub)? {
            self.next_expansion_token(from_sub)?;
            return Ok(args);
        }

        'args: loop {
            let mut arg = Vec::new();
            let mut level = 0i32;
            loop {
                let t = self.next_expansion_token(from_sub)?;
                match &t.kind {
                    PPTokenKind::Eof => return Err(PPError::UnexpectedEof.into()),
                    PPTokenKind::Punct(Punct::RParen) if level == 0 => {
                        args.push(arg);
                        break 'args;
                    }
                    PPTokenKind::Punct(Punct::Comma) if level == 0 => {
                        args.push(arg);
                        break;
                    }
                    _ => {
                        match t.kind {
                            PPTokenKind::Punct(Punct::LParen) => level += 1,
                            PPTokenKind::Punct(Punct::RParen) => level -= 1,
                            _ => {}
                        }
                        arg.push(t);
                    }
                }
            }
        }
        Ok(args)
    }

    fn next_expansion_token(&mut self, from_sub: bool) -> Result<PPToken> {
        if from_sub {
            self.sub
                .pop_front()
                .ok_or_else(|| CompileError::from(PPError::UnexpectedEof))
        } else {
            Ok(self.next_raw()?.0)
        }
    }

    fn peek_expansion_is_rparen(&mut self, from_sub: bool) -> Result<bool> {
        if from_sub {
            Ok(matches!(
                self.sub.front().map(|t| &t.kind),
                Some(PPTokenKind::Punct(Punct::RParen))
            ))
        } else {
            Ok(matches!(
                self.peek_from_source()?.kind,
                PPTokenKind::Punct(Punct::RParen)
            ))
        }
    }
}

impl PPTokenRead for Preprocessor<'_> {
    fn next_pp_token(&mut self) -> Result<PPToken> {
        self.next_token()
    }
}

/// マクロ本体のトークンを複製し、呼び出し位置の hide-set と
/// マクロ自身の名前を引き継がせる（共有トークンは書き換えない）
fn inherit_hide_set(
    mut t: PPToken,
    call_hide: &HashSet<InternedStr>,
    name: InternedStr,
) -> PPToken {
    t.expanded_from.extend(call_hide.iter().copied());
    t.expanded_from.insert(name);
    t
}

/// 関数マクロの本体中のパラメータ参照を Param トークンに書き換える
///
/// `#` の直後がパラメータ名なら文字列化 Param になる。それ以外の
/// `#` は関数マクロの本体では許されない。
fn rewrite_macro_body(body: Vec<PPToken>, params: &[InternedStr]) -> Result<Vec<PPToken>> {
    let mut out = Vec::with_capacity(body.len());
    let mut iter = body.into_iter().peekable();
    while let Some(t) = iter.next() {
        if matches!(t.kind, PPTokenKind::Punct(Punct::Hash)) {
            let index = iter
                .peek()
                .and_then(|n| n.ident())
                .and_then(|id| params.iter().position(|p| *p == id));
            let Some(index) = index else {
                return Err(PPError::StringizeParamExpected.into());
            };
            iter.next();
            out.push(param_token(index, true, t.adjacent));
            continue;
        }
        if let Some(index) = t
            .ident()
            .and_then(|id| params.iter().position(|p| *p == id))
        {
            out.push(param_token(index, false, t.adjacent));
            continue;
        }
        out.push(t);
    }
    Ok(out)
}

fn param_token(index: usize, stringify: bool, adjacent: bool) -> PPToken {
    let mut t = PPToken::new(PPTokenKind::Param { index, stringify }, "");
    t.adjacent = adjacent;
    t
}

/// `#` 演算子: 引数トークン列を1つの文字列リテラルに変換する
///
/// raw スペリングを連結し、隣接していなかった境界には空白を1つ
/// 挟む。文字列リテラルの raw は `\` と `"` を二重化してから
/// 埋め込む。結果を文字列リテラルとして読み直すことで検証と
/// 値のデコードを同時に行う。
fn stringify_arg(arg: &[PPToken]) -> Result<PPToken> {
    let mut lit = String::new();
    for t in arg {
        let raw = if matches!(t.kind, PPTokenKind::Str(_)) {
            t.raw.replace('\\', "\\\\").replace('"', "\\\"")
        } else {
            t.raw.clone()
        };
        if t.adjacent || lit.is_empty() {
            lit.push_str(&raw);
        } else {
            lit.push(' ');
            lit.push_str(&raw);
        }
    }
    let raw = format!("\"{}\"", lit);
    let mut src = SliceSource::new(raw.as_bytes());
    let val = literal::read_string(&mut src)
        .map_err(|_| CompileError::from(PPError::MalformedStringize(raw.clone())))?;
    Ok(PPToken::new(PPTokenKind::Str(val), raw))
}

/// 翻訳単位を最後まで前処理し、文字列連結まで済ませたPPトークン列を返す
pub fn preprocess(
    files: &dyn FileSet,
    path: &str,
    interner: &mut StringInterner,
) -> Result<Vec<PPToken>> {
    let pp = Preprocessor::new(files, path, interner)?;
    let mut concat = crate::concat::StringConcatter::new(pp);
    let mut out = Vec::new();
    loop {
        let t = concat.next_pp_token()?;
        if t.is_eof() {
            break;
        }
        out.push(t);
    }
    Ok(out)
}
