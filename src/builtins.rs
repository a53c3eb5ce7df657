//! ビルトインコマンドの実装。
//!
//! ビルトインは exec を経由せず、呼び出したプロセスの中で直接実行される。
//! パイプも `;` も `&` もない単独のビルトインはシェル本体で（`cd` が効くのはこの場合だけ）、
//! それ以外は fork 先の子プロセスの中で実行される。
//!
//! 出力は `out` に書く。シェル本体ではリダイレクト先ファイルか stdout、
//! 子プロセスでは dup2 済みの stdout が渡される。

use std::env;
use std::io::Write;

use crate::error::ShellError;
use crate::history::History;

/// ビルトインの種類。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    /// `cd [dir]`
    Cd,
    /// `history`
    History,
    /// `exit [N]`
    Exit,
}

impl Builtin {
    /// コマンド名からビルトインを引く。該当なしなら `None`（外部コマンドとして exec する）。
    pub fn lookup(name: &str) -> Option<Self> {
        match name {
            "cd" => Some(Self::Cd),
            "history" => Some(Self::History),
            "exit" => Some(Self::Exit),
            _ => None,
        }
    }
}

/// ビルトインを実行し、終了ステータスを返す。
///
/// `last_status` は引数なしの `exit` が返す値。失敗は報告用の [`ShellError::Builtin`] になる。
pub fn run(
    builtin: Builtin,
    args: &[String],
    history: &History,
    last_status: i32,
    out: &mut dyn Write,
) -> Result<i32, ShellError> {
    match builtin {
        Builtin::Cd => builtin_cd(args),
        Builtin::History => builtin_history(history, out),
        Builtin::Exit => builtin_exit(args, last_status),
    }
}

/// `cd [dir]` — カレントディレクトリを変更する。引数省略時は `$HOME` に移動。
fn builtin_cd(args: &[String]) -> Result<i32, ShellError> {
    let target = match args.get(1) {
        Some(dir) => dir.clone(),
        None => env::var("HOME").map_err(|_| ShellError::Builtin {
            name: "cd",
            message: "HOME not set".to_string(),
        })?,
    };

    env::set_current_dir(&target).map_err(|e| ShellError::Builtin {
        name: "cd",
        message: format!("{}: {}", target, e),
    })?;
    Ok(0)
}

/// `history` — 記録済みの行を番号付きで表示する。
fn builtin_history(history: &History, out: &mut dyn Write) -> Result<i32, ShellError> {
    history.print(out).map_err(|e| ShellError::Builtin {
        name: "history",
        message: e.to_string(),
    })?;
    Ok(0)
}

/// `exit [N]` — 終了ステータスを決める。シェルを止めるかどうかは呼び出し側が判断する。
fn builtin_exit(args: &[String], last_status: i32) -> Result<i32, ShellError> {
    match args.get(1) {
        Some(n) => n.parse::<i32>().map_err(|_| ShellError::Builtin {
            name: "exit",
            message: format!("{}: numeric argument required", n),
        }),
        None => Ok(last_status),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn lookup_known_names() {
        assert_eq!(Builtin::lookup("cd"), Some(Builtin::Cd));
        assert_eq!(Builtin::lookup("history"), Some(Builtin::History));
        assert_eq!(Builtin::lookup("exit"), Some(Builtin::Exit));
        assert_eq!(Builtin::lookup("ls"), None);
        assert_eq!(Builtin::lookup("CD"), None);
    }

    #[test]
    fn cd_nonexistent_is_reported() {
        let err = builtin_cd(&args(&["cd", "/nonexistent_forksh_dir"])).unwrap_err();
        let msg = err.to_string();
        assert!(msg.starts_with("cd: /nonexistent_forksh_dir: "), "{}", msg);
        assert_eq!(err.exit_status(), 1);
    }

    #[test]
    fn history_prints_entries() {
        let dir = tempfile::tempdir().unwrap();
        let history = History::create(dir.path().join("hist")).unwrap();
        history.add("echo one").unwrap();
        history.add("echo two").unwrap();

        let mut buf = Vec::new();
        let status = run(Builtin::History, &args(&["history"]), &history, 0, &mut buf).unwrap();
        assert_eq!(status, 0);
        assert_eq!(String::from_utf8(buf).unwrap(), "    1  echo one\n    2  echo two\n");
    }

    #[test]
    fn history_missing_file_is_builtin_error() {
        let dir = tempfile::tempdir().unwrap();
        let history = History::create(dir.path().join("hist")).unwrap();
        std::fs::remove_file(history.path()).unwrap();

        let mut buf = Vec::new();
        let err = run(Builtin::History, &args(&["history"]), &history, 0, &mut buf).unwrap_err();
        assert!(matches!(err, ShellError::Builtin { name: "history", .. }));
    }

    #[test]
    fn exit_status_values() {
        assert_eq!(builtin_exit(&args(&["exit"]), 3).unwrap(), 3);
        assert_eq!(builtin_exit(&args(&["exit", "7"]), 0).unwrap(), 7);
        assert!(builtin_exit(&args(&["exit", "abc"]), 0).is_err());
    }
}
