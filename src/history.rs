//! コマンド履歴の管理。
//!
//! 受け付けた入力行を 1 行ずつファイルに追記し、`history` ビルトインで列挙する。
//!
//! ## ファイル形式
//!
//! - パス: [`Config`](crate::config::Config) が決める（既定 `$HOME/.forksh_history`）
//! - 起動時に切り詰める（セッションごとの記録）
//! - 書き込み: 追記モード（[`OpenOptions::append`]）で 1 行ずつ
//! - 空行は記録しない。前後の空白は取り除く

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// コマンド履歴。内容はファイルにのみ持ち、メモリには保持しない。
///
/// fork 先の子プロセスからも同じファイルを読めるので、パイプラインの途中で
/// `history` を実行しても同じ結果になる。
pub struct History {
    path: PathBuf,
}

impl History {
    /// 履歴ファイルを作成する。既に存在すれば空にする。シェル起動時に 1 回だけ呼ぶ。
    pub fn create(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        File::create(&path)?;
        Ok(Self { path })
    }

    /// 履歴ファイルのパス。
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 1 行追記する。空白のみの行は記録しない。
    pub fn add(&self, line: &str) -> io::Result<()> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(());
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)
    }

    /// 記録済みのエントリをファイル順（古い順）で返す。
    pub fn entries(&self) -> io::Result<Vec<String>> {
        let reader = BufReader::new(File::open(&self.path)?);
        reader.lines().collect()
    }

    /// `history` ビルトインの出力: 1 始まりの番号付きで全エントリを書き出す。
    pub fn print(&self, out: &mut dyn Write) -> io::Result<()> {
        for (i, entry) in self.entries()?.iter().enumerate() {
            writeln!(out, "{:5}  {}", i + 1, entry)?;
        }
        Ok(())
    }
}
