use std::fmt;

/// 字句読み取りエラー
///
/// ソースストリーム・リテラルリーダー・PPトークナイザが報告するエラー。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    /// 予期しないストリーム終端
    UnexpectedEof,
    /// 期待したバイトと異なるバイトを読んだ
    Expected { expected: u8, found: u8 },
    /// 閉じられていないブロックコメント
    UnclosedBlockComment,
    /// 文字列リテラル中の改行
    NewlineInString,
    /// 文字リテラル中の改行
    NewlineInChar,
    /// 空の文字リテラル（またはエスケープされていない '）
    EmptyCharLit,
    /// 閉じられていないヘッダー名
    UnterminatedHeaderName,
    /// 未知のエスケープシーケンス
    UnknownEscape(u8),
    /// \x の後に16進数字がない
    NonHexEscape(u8),
    /// 8進エスケープの値が255を超えた
    OctalEscapeOutOfRange(u32),
    /// \u / \U は認識するが未実装
    EscapeNotImplemented(u8),
    /// pp-number の先頭が数字でも . でもない
    ExpectedDigit(u8),
    /// 識別子の先頭が nondigit でない
    ExpectedNondigit(u8),
    /// 整数リテラルの先頭が数字でない
    NonDigit,
    /// 8進定数に 8 または 9 が含まれる
    MalformedOctal,
    /// 不正な整数サフィックス
    InvalidSuffix(String),
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexError::UnexpectedEof => write!(f, "unexpected EOF"),
            LexError::Expected { expected, found } => {
                write!(f, "expected '{}' but '{}'", *expected as char, *found as char)
            }
            LexError::UnclosedBlockComment => write!(f, "unclosed block comment"),
            LexError::NewlineInString => write!(f, "newline in string"),
            LexError::NewlineInChar => write!(f, "newline in character literal"),
            LexError::EmptyCharLit => {
                write!(f, "empty character literal or unescaped ' in character literal")
            }
            LexError::UnterminatedHeaderName => write!(f, "unterminated header-name"),
            LexError::UnknownEscape(c) => {
                write!(f, "unknown escape sequence: '\\{}'", *c as char)
            }
            LexError::NonHexEscape(c) => {
                write!(f, "non-hex character in escape sequence: '{}'", *c as char)
            }
            LexError::OctalEscapeOutOfRange(v) => write!(f, "octal escape value > 255: {}", v),
            LexError::EscapeNotImplemented(c) => match c {
                b'u' => write!(f, "\\uxxxx is not implemented yet"),
                _ => write!(f, "\\Uxxxxxxxx is not implemented yet"),
            },
            LexError::ExpectedDigit(c) => {
                write!(f, "expected digit or . but '{}'", *c as char)
            }
            LexError::ExpectedNondigit(c) => {
                write!(f, "expected nondigit but '{}'", *c as char)
            }
            LexError::NonDigit => write!(f, "non-digit character"),
            LexError::MalformedOctal => write!(f, "malformed octal constant"),
            LexError::InvalidSuffix(s) => write!(f, "unexpected suffix {:?}", s),
        }
    }
}

/// プリプロセッサエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PPError {
    /// ディレクティブやマクロ呼び出しの途中でトークンが尽きた
    UnexpectedEof,
    /// 期待したトークンと異なるトークンを読んだ
    Expected { expected: String, found: String },
    /// 関数マクロの引数の個数が合わない
    WrongArgCount { expected: usize, got: usize },
    /// 再帰的な #include
    RecursiveInclude(String),
    /// インクルード対象が見つからない
    FileNotFound(String),
    /// インクルード対象の読み込みに失敗
    Io(String, String),
    /// 未知のディレクティブ
    InvalidDirective(String),
    /// 認識はするが実行しないディレクティブ（#if 系, #line, #pragma）
    NotImplemented(String),
    /// # の直後がマクロパラメータでない
    StringizeParamExpected,
    /// # 演算子の生成結果が文字列リテラルとして不正
    MalformedStringize(String),
    /// #error ディレクティブの内容
    ErrorDirective(String),
}

impl fmt::Display for PPError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PPError::UnexpectedEof => write!(f, "unexpected EOF"),
            PPError::Expected { expected, found } => {
                write!(f, "expected {} but {}", expected, found)
            }
            PPError::WrongArgCount { expected, got } => {
                write!(f, "expected {} args but {}", expected, got)
            }
            PPError::RecursiveInclude(path) => write!(f, "recursive #include: {}", path),
            PPError::FileNotFound(path) => write!(f, "file not found: {}", path),
            PPError::Io(path, err) => write!(f, "I/O error reading {}: {}", path, err),
            PPError::InvalidDirective(name) => {
                write!(f, "invalid preprocessing directive {}", name)
            }
            PPError::NotImplemented(name) => write!(f, "#{} is not implemented", name),
            PPError::StringizeParamExpected => {
                write!(f, "'#' is not followed by a macro parameter")
            }
            PPError::MalformedStringize(raw) => {
                write!(f, "malformed '#' stringification: {}", raw)
            }
            PPError::ErrorDirective(msg) => write!(f, "#error{}", msg),
        }
    }
}

/// トークン精製エラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// PPトークンをCトークンに変換できない
    InvalidToken(String),
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenError::InvalidToken(raw) => write!(f, "invalid token: {:?}", raw),
        }
    }
}

/// 統合エラー型
///
/// 全段のエラーを一つのチャネルで報告する。メッセージには段ごとの
/// プレフィックスが付く。位置情報は Source 側が保持しており、
/// メッセージには埋め込まない（呼び出し側が付与する）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// 字句エラー
    Lex(LexError),
    /// プリプロセッサエラー
    Preprocess(PPError),
    /// トークン精製エラー
    Token(TokenError),
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::Lex(e) => write!(f, "lex: {}", e),
            CompileError::Preprocess(e) => write!(f, "preprocess: {}", e),
            CompileError::Token(e) => write!(f, "token: {}", e),
        }
    }
}

impl std::error::Error for CompileError {}

impl From<LexError> for CompileError {
    fn from(e: LexError) -> Self {
        CompileError::Lex(e)
    }
}

impl From<PPError> for CompileError {
    fn from(e: PPError) -> Self {
        CompileError::Preprocess(e)
    }
}

impl From<TokenError> for CompileError {
    fn from(e: TokenError) -> Self {
        CompileError::Token(e)
    }
}

/// Result型エイリアス
pub type Result<T> = std::result::Result<T, CompileError>;
