//! 翻訳単位へのファイル供給
//!
//! プリプロセッサはパスからバイト列への写像だけを要求する。
//! テストではメモリ上のテーブル、実行時にはディレクトリを同じ
//! インターフェースで使える。

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;

/// パス → バイト列 の写像
pub trait FileSet {
    /// パスに対応するファイル内容を読む
    ///
    /// 存在しないパスは `io::ErrorKind::NotFound` を返す。その他の
    /// I/O エラーはそのまま呼び出し側へ伝播する。
    fn read_file(&self, path: &str) -> io::Result<Vec<u8>>;
}

/// メモリ上のファイルテーブル
#[derive(Debug, Default, Clone)]
pub struct MemoryFileSet {
    files: HashMap<String, Vec<u8>>,
}

impl MemoryFileSet {
    /// 空のテーブルを作成
    pub fn new() -> Self {
        Self::default()
    }

    /// ファイルを登録（同じパスは上書き）
    pub fn insert(&mut self, path: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.files.insert(path.into(), content.into());
    }

    /// 登録されているファイル数
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// テーブルが空かどうか
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FileSet for MemoryFileSet {
    fn read_file(&self, path: &str) -> io::Result<Vec<u8>> {
        match self.files.get(path) {
            Some(content) => Ok(content.clone()),
            None => Err(io::Error::new(io::ErrorKind::NotFound, path.to_string())),
        }
    }
}

impl<const N: usize> From<[(&str, &str); N]> for MemoryFileSet {
    fn from(entries: [(&str, &str); N]) -> Self {
        let mut files = MemoryFileSet::new();
        for (path, content) in entries {
            files.insert(path, content);
        }
        files
    }
}

/// ディレクトリをルートとするファイルセット
#[derive(Debug, Clone)]
pub struct DirFileSet {
    root: PathBuf,
}

impl DirFileSet {
    /// ルートディレクトリを指定して作成
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl FileSet for DirFileSet {
    fn read_file(&self, path: &str) -> io::Result<Vec<u8>> {
        fs::read(self.root.join(path))
    }
}
