//! エラー型: パースエラー（[`ParseError`]）と実行時エラー（[`ShellError`]）。
//!
//! fork 先の子プロセスで起きたエラーは親に伝播しない。子は診断メッセージを stderr に出し、
//! [`ShellError::exit_status`] の値で終了する。親から見えるのはその終了ステータスだけ。
//!
//! | 種別 | バリアント | 影響範囲 |
//! |------|-----------|----------|
//! | 不正なディレクティブ | [`ShellError::Malformed`] | 現在の行（ステータス 2） |
//! | リダイレクト先を開けない | [`ShellError::RedirectOpen`] | 開こうとしたプロセス |
//! | fork 失敗 | [`ShellError::Fork`] | シェル全体（トップレベル時） |
//! | exec 失敗 | [`ShellError::Exec`] | exec しようとしたプロセスのみ |
//! | ビルトイン失敗 | [`ShellError::Builtin`] | 報告してステータス 1 |

use std::io;

use nix::errno::Errno;
use thiserror::Error;

/// パース時に発生しうるエラー。どれも現在の行だけを失敗させる。
#[derive(Debug, PartialEq, Eq, Error)]
pub enum ParseError {
    /// `<` / `>` の後にパスがない、または直後が `;` / `|`。引数は演算子の先頭文字。
    #[error("syntax error: missing redirect target after `{0}`")]
    MissingRedirectTarget(char),
    /// `|` の前後にコマンドがない。
    #[error("syntax error near unexpected token `|`")]
    EmptyPipelineSegment,
    /// ディレクティブを除くと引数が残らない（`> out` や `&` だけの区間）。
    #[error("syntax error: missing command")]
    MissingCommand,
}

/// 実行時エラー。
#[derive(Debug, Error)]
pub enum ShellError {
    #[error(transparent)]
    Malformed(#[from] ParseError),

    #[error("{path}: {source}")]
    RedirectOpen {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("fork: {0}")]
    Fork(Errno),

    #[error("pipe: {0}")]
    Pipe(Errno),

    #[error("dup2: {0}")]
    Dup(Errno),

    #[error("wait: {0}")]
    Wait(Errno),

    #[error("{}: {}", .command, exec_reason(.errno))]
    Exec { command: String, errno: Errno },

    #[error("{name}: {message}")]
    Builtin { name: &'static str, message: String },

    #[error("{0}")]
    Usage(String),
}

impl ShellError {
    /// エラーに対応する終了ステータスを返す。
    /// 127 = command not found, 126 = permission denied, 2 = 構文・使い方の誤り, 1 = その他。
    pub fn exit_status(&self) -> i32 {
        match self {
            Self::Malformed(_) | Self::Usage(_) => 2,
            Self::Exec { errno: Errno::ENOENT, .. } => 127,
            Self::Exec { errno: Errno::EACCES, .. } => 126,
            _ => 1,
        }
    }

    /// fork できない状態ではシェル自体を続行できない。
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fork(_))
    }
}

fn exec_reason(errno: &Errno) -> &'static str {
    match *errno {
        Errno::ENOENT => "command not found",
        Errno::EACCES => "permission denied",
        _ => errno.desc(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exec_not_found_is_127() {
        let e = ShellError::Exec {
            command: "nosuch".to_string(),
            errno: Errno::ENOENT,
        };
        assert_eq!(e.exit_status(), 127);
        assert_eq!(e.to_string(), "nosuch: command not found");
    }

    #[test]
    fn exec_permission_denied_is_126() {
        let e = ShellError::Exec {
            command: "./script".to_string(),
            errno: Errno::EACCES,
        };
        assert_eq!(e.exit_status(), 126);
        assert_eq!(e.to_string(), "./script: permission denied");
    }

    #[test]
    fn malformed_is_2() {
        let e = ShellError::from(ParseError::MissingRedirectTarget('>'));
        assert_eq!(e.exit_status(), 2);
        assert_eq!(e.to_string(), "syntax error: missing redirect target after `>`");
    }

    #[test]
    fn builtin_message() {
        let e = ShellError::Builtin {
            name: "cd",
            message: "HOME not set".to_string(),
        };
        assert_eq!(e.exit_status(), 1);
        assert_eq!(e.to_string(), "cd: HOME not set");
    }

    #[test]
    fn only_fork_is_fatal() {
        assert!(ShellError::Fork(Errno::EAGAIN).is_fatal());
        assert!(!ShellError::Pipe(Errno::EMFILE).is_fatal());
        assert!(!ShellError::Wait(Errno::ECHILD).is_fatal());
    }
}
