//! 起動設定: コマンドライン引数と環境変数から [`Config`] を組み立てる。
//!
//! | 入力 | 効果 |
//! |------|------|
//! | `-c LINE` | 1 行だけ実行して終了（終了ステータスはその行のもの） |
//! | `FORKSH_HISTORY` | 履歴ファイルのパス |
//! | `HOME` | 既定の履歴ファイル `$HOME/.forksh_history`（未設定時は `/tmp`） |

use std::ffi::OsString;
use std::path::PathBuf;

use crate::error::ShellError;

/// 履歴ファイルのパスを上書きする環境変数。
pub const HISTORY_ENV: &str = "FORKSH_HISTORY";

const HISTORY_FILE_NAME: &str = ".forksh_history";

const USAGE: &str = "usage: forksh [-c command]";

/// シェルの起動設定。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// 履歴ファイルのパス。起動時に切り詰められる。
    pub history_path: PathBuf,
    /// `-c` で渡された行。`None` なら stdin から読むループを回す。
    pub command: Option<String>,
}

impl Config {
    /// 実際のプロセス引数と環境変数から読み込む。
    pub fn load() -> Result<Self, ShellError> {
        Self::from_parts(
            decode_args(std::env::args_os().skip(1))?,
            std::env::var(HISTORY_ENV).ok(),
            std::env::var("HOME").ok(),
        )
    }

    /// 引数（プログラム名を除く）と環境変数の値から組み立てる。
    pub fn from_parts<I>(
        args: I,
        history_env: Option<String>,
        home: Option<String>,
    ) -> Result<Self, ShellError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut command = None;
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-c" => match args.next() {
                    Some(line) => command = Some(line),
                    None => {
                        return Err(ShellError::Usage(format!(
                            "-c: option requires an argument\n{}",
                            USAGE
                        )))
                    }
                },
                other => {
                    return Err(ShellError::Usage(format!(
                        "{}: invalid option\n{}",
                        other, USAGE
                    )))
                }
            }
        }

        let history_path = match history_env.filter(|p| !p.is_empty()) {
            Some(path) => PathBuf::from(path),
            None => home
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("/tmp"))
                .join(HISTORY_FILE_NAME),
        };

        Ok(Self {
            history_path,
            command,
        })
    }
}

/// 引数を `String` に変換する。UTF-8 でない引数は使い方の誤りとして扱う。
fn decode_args<I>(args: I) -> Result<Vec<String>, ShellError>
where
    I: IntoIterator<Item = OsString>,
{
    args.into_iter()
        .map(|arg| {
            arg.into_string().map_err(|arg| {
                ShellError::Usage(format!(
                    "{}: invalid argument encoding\n{}",
                    arg.to_string_lossy(),
                    USAGE
                ))
            })
        })
        .collect()
}
