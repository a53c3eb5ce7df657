//! コマンド実行: パース済みの [`CommandTree`] を fork / pipe / exec に落とし込む。
//!
//! - [`execute`]: 行全体の入口。シェル本体で呼ぶ。
//!   - 単独ビルトイン（パイプ・`;`・`&` なし）: fork なしの高速パス（[`execute_builtin`]）
//!   - それ以外: トップレベルの子を 1 つ fork し、その中で [`run_tree`] を実行
//!   - foreground: トップレベルの子を待つ / background: ジョブテーブルに登録して即座に返る
//! - [`run_sequence`]: `a ; b ; …` — 先頭セグメントと残りをそれぞれ子に fork（右再帰）。短絡しない
//! - [`run_pipeline`]: `a | b | …` — パイプ 1 本 + 子 2 つ（右再帰）
//! - [`launch`]: リダイレクト適用 → ビルトイン → glob 展開 → exec
//!
//! [`run_tree`] 以下は fork 先の子プロセスの中でだけ呼ばれる。終端ケース（単一セグメント・単一ステージ）は
//! 新たに fork せず、そのプロセス自身が [`launch`] で exec される。

use std::borrow::Cow;
use std::fs::File;
use std::io;
use std::os::unix::io::IntoRawFd;

use crate::builtins::{self, Builtin};
use crate::error::ShellError;
use crate::glob;
use crate::history::History;
use crate::parser::{CommandLine, CommandTree, Directives, SimpleCommand};
use crate::process::{self, Pipe};
use crate::shell::Shell;

/// 1 行の実行中に子プロセスへ引き継ぐ読み取り専用の文脈。
#[derive(Clone, Copy)]
pub struct ExecContext<'a> {
    /// `history` ビルトイン用。
    pub history: &'a History,
    /// 行の実行開始時点の直前ステータス（`exit` の既定値）。
    pub last_status: i32,
}

/// エラーを stderr に報告し、対応する終了ステータスに変換する。
fn report(result: Result<i32, ShellError>) -> i32 {
    match result {
        Ok(status) => status,
        Err(e) => {
            eprintln!("forksh: {}", e);
            e.exit_status()
        }
    }
}

/// 1 行を実行し、終了ステータスを返す。
///
/// `cmd_text` は元のコマンド文字列で、ジョブテーブルの表示用に使用される。
/// `Err` になるのはシェル本体での fork / wait の失敗だけ。
pub fn execute(shell: &mut Shell, line: &CommandLine, cmd_text: &str) -> Result<i32, ShellError> {
    if !line.background {
        if let Some(cmd) = line.as_simple() {
            if let Some(builtin) = Builtin::lookup(cmd.program()) {
                return Ok(execute_builtin(shell, builtin, cmd));
            }
        }
    }

    let ctx = ExecContext {
        history: &shell.history,
        last_status: shell.last_status,
    };
    let pid = process::fork_child(|| report(run_tree(&line.tree, ctx)))?;

    if line.background {
        let job_id = shell.jobs.insert(pid, cmd_text);
        eprintln!("[{}] {}", job_id, pid);
        return Ok(0);
    }

    process::wait_status(pid)
}

// ── ビルトイン高速パス ──────────────────────────────────────────────

/// 単一ビルトインを fork なしで実行する。
///
/// シェル自身の fd には触れない。`>` があればファイルを開いてそこへ書き、
/// `<` は開けるかどうかだけ確認する（ビルトインは stdin を読まない）。
fn execute_builtin(shell: &mut Shell, builtin: Builtin, cmd: &SimpleCommand) -> i32 {
    let result = open_builtin_output(&cmd.directives).and_then(|mut file| {
        let mut stdout = io::stdout();
        let out: &mut dyn io::Write = match file {
            Some(ref mut f) => f,
            None => &mut stdout,
        };
        builtins::run(builtin, &cmd.argv, &shell.history, shell.last_status, out)
    });

    if builtin == Builtin::Exit && result.is_ok() {
        shell.should_exit = true;
    }
    report(result)
}

/// ビルトイン用のリダイレクト先を開く。`>` がなければ `Ok(None)`。
fn open_builtin_output(directives: &Directives) -> Result<Option<File>, ShellError> {
    if let Some(path) = &directives.input {
        File::open(path).map_err(|source| ShellError::RedirectOpen {
            path: path.clone(),
            source,
        })?;
    }
    match &directives.output {
        Some(path) => File::create(path)
            .map(Some)
            .map_err(|source| ShellError::RedirectOpen {
                path: path.clone(),
                source,
            }),
        None => Ok(None),
    }
}

// ── ツリーの解釈（子プロセス内） ─────────────────────────────────────

/// ツリーの 1 ノードを現在のプロセスで実行する。
///
/// exec に成功すると戻らない。戻り値はビルトインの終了ステータスか、exec 前のエラー。
pub fn run_tree(tree: &CommandTree, ctx: ExecContext<'_>) -> Result<i32, ShellError> {
    match tree {
        CommandTree::Simple(cmd) => launch(cmd, ctx),
        CommandTree::Pipeline(stages) => run_pipeline(stages, ctx),
        CommandTree::Sequence(segments) => run_sequence(segments, ctx),
    }
}

/// `seg1 ; seg2 ; … ; segN` を独立したプロセス木として実行する。
///
/// 先頭セグメントを 1 つの子で、残りを別の子で（再帰的に）実行し、両方を待つ。
/// 両者は並行して動き、一方の失敗がもう一方の実行を妨げることはない。
/// 戻り値は右側（最後のセグメントを含む側）の終了ステータス。
pub fn run_sequence(segments: &[CommandTree], ctx: ExecContext<'_>) -> Result<i32, ShellError> {
    let (first, rest) = match segments {
        [] => return Ok(0),
        [only] => return run_tree(only, ctx),
        [first, rest @ ..] => (first, rest),
    };

    let left = process::fork_child(|| report(run_tree(first, ctx)))?;
    let right = match process::fork_child(|| report(run_sequence(rest, ctx))) {
        Ok(pid) => pid,
        Err(e) => {
            let _ = process::wait_status(left);
            return Err(e);
        }
    };

    let left_status = process::wait_status(left);
    let right_status = process::wait_status(right);
    left_status?;
    right_status
}

/// `stage1 | stage2 | … | stageN` を実行する。
///
/// パイプを 1 本作り、左の子は stdout を書き込み端に付け替えて先頭ステージを起動、
/// 右の子は stdin を読み取り端に付け替えて残りを再帰的に実行する。
/// このプロセス自身はパイプを使わないので fork 直後に両端を閉じ、両方の子を待つ。
/// 戻り値は右側（最終ステージを含む側）の終了ステータス。
pub fn run_pipeline(stages: &[SimpleCommand], ctx: ExecContext<'_>) -> Result<i32, ShellError> {
    let (first, rest) = match stages {
        [] => return Ok(0),
        [only] => return launch(only, ctx),
        [first, rest @ ..] => (first, rest),
    };

    let pipe = Pipe::open()?;

    let left = match process::fork_child(|| {
        report(pipe.attach_write_end().and_then(|()| launch(first, ctx)))
    }) {
        Ok(pid) => pid,
        Err(e) => {
            pipe.close();
            return Err(e);
        }
    };

    let right = process::fork_child(|| {
        report(pipe.attach_read_end().and_then(|()| run_pipeline(rest, ctx)))
    });
    pipe.close();
    let right = match right {
        Ok(pid) => pid,
        Err(e) => {
            let _ = process::wait_status(left);
            return Err(e);
        }
    };

    let left_status = process::wait_status(left);
    let right_status = process::wait_status(right);
    left_status?;
    right_status
}

// ── コマンド起動 ───────────────────────────────────────────────────

/// 単一コマンドを起動する。
///
/// 1. `<` / `>` を stdin / stdout に適用（開けなければエラー）
/// 2. ビルトインならこのプロセス内で実行して終了ステータスを返す
/// 3. ワイルドカードがあれば glob 展開した引数列で、なければそのまま exec
///
/// exec に成功すると戻らない。
pub fn launch(cmd: &SimpleCommand, ctx: ExecContext<'_>) -> Result<i32, ShellError> {
    apply_redirects(&cmd.directives)?;

    if let Some(builtin) = Builtin::lookup(cmd.program()) {
        return builtins::run(
            builtin,
            &cmd.argv,
            ctx.history,
            ctx.last_status,
            &mut io::stdout(),
        );
    }

    let argv: Cow<'_, [String]> = match cmd.directives.wildcard {
        Some(index) => Cow::Owned(glob::expand_argv(&cmd.argv, index)),
        None => Cow::Borrowed(&cmd.argv),
    };
    Err(process::exec_replace(&argv))
}

/// リダイレクト先を開き、stdin / stdout に複製する。
fn apply_redirects(directives: &Directives) -> Result<(), ShellError> {
    if let Some(path) = &directives.input {
        let file = File::open(path).map_err(|source| ShellError::RedirectOpen {
            path: path.clone(),
            source,
        })?;
        process::redirect_fd(file.into_raw_fd(), libc::STDIN_FILENO)?;
    }
    if let Some(path) = &directives.output {
        let file = File::create(path).map_err(|source| ShellError::RedirectOpen {
            path: path.clone(),
            source,
        })?;
        process::redirect_fd(file.into_raw_fd(), libc::STDOUT_FILENO)?;
    }
    Ok(())
}
