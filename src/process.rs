//! fork / pipe / dup2 / exec / wait の薄いラッパー（`nix` ベース）。
//!
//! ## 構成
//!
//! | 関数・型 | 役割 |
//! |---------|------|
//! | [`fork_child`] | fork して子でクロージャを実行し、その戻り値で終了する |
//! | [`wait_status`] | 子の終了を待ち、終了ステータスを整数で返す |
//! | [`try_wait`] | 非ブロッキングで子の終了を確認する |
//! | [`Pipe`] | パイプの両端。子側で片方を stdin/stdout に付け替え、両端を close する |
//! | [`redirect_fd`] | `dup2` + 元 fd の close |
//! | [`exec_replace`] | `execvp` でプロセスイメージを置換する |
//! | [`exit_child`] | 出力を flush してから `_exit` |

use std::ffi::CString;
use std::io::{self, Write};
use std::os::fd::IntoRawFd;
use std::os::unix::io::RawFd;

use nix::errno::Errno;
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::{self, execvp, fork, ForkResult, Pid};

use crate::error::ShellError;

// ── fork / wait ───────────────────────────────────────────────────

/// fork して子プロセスで `body` を実行する。親には子の PID を返す。
///
/// 子は `body` の戻り値を終了ステータスとして `_exit` し、呼び出し元には戻らない。
/// fork 前に stdout を flush する（親のバッファが子で二重に書き出されないように）。
pub fn fork_child<F>(body: F) -> Result<Pid, ShellError>
where
    F: FnOnce() -> i32,
{
    let _ = io::stdout().flush();
    match unsafe { fork() }.map_err(ShellError::Fork)? {
        ForkResult::Parent { child } => Ok(child),
        ForkResult::Child => exit_child(body()),
    }
}

/// stdout/stderr を flush してから `_exit` する。
///
/// fork 先では Rust ランタイムの終了処理を走らせない。
pub fn exit_child(status: i32) -> ! {
    let _ = io::stdout().flush();
    let _ = io::stderr().flush();
    unsafe { libc::_exit(status) }
}

/// `waitpid` の結果を終了ステータスに変換する。シグナル終了は 128 + シグナル番号。
fn status_code(status: WaitStatus) -> Option<i32> {
    match status {
        WaitStatus::Exited(_, code) => Some(code),
        WaitStatus::Signaled(_, signal, _) => Some(128 + signal as i32),
        _ => None,
    }
}

/// 子プロセスの終了を待ち、終了ステータスを返す。
pub fn wait_status(pid: Pid) -> Result<i32, ShellError> {
    loop {
        match waitpid(pid, None) {
            Ok(status) => {
                if let Some(code) = status_code(status) {
                    return Ok(code);
                }
            }
            Err(Errno::EINTR) => continue,
            Err(e) => return Err(ShellError::Wait(e)),
        }
    }
}

/// 子プロセスが終了していれば終了ステータスを、まだ動いていれば `None` を返す。
pub fn try_wait(pid: Pid) -> Result<Option<i32>, ShellError> {
    match waitpid(pid, Some(WaitPidFlag::WNOHANG)) {
        Ok(WaitStatus::StillAlive) => Ok(None),
        Ok(status) => Ok(status_code(status)),
        Err(e) => Err(ShellError::Wait(e)),
    }
}

// ── fd 操作 ───────────────────────────────────────────────────────

/// `fd` を `target` に複製し、元の `fd` を閉じる。
pub fn redirect_fd(fd: RawFd, target: RawFd) -> Result<(), ShellError> {
    if fd == target {
        return Ok(());
    }
    unistd::dup2(fd, target).map_err(ShellError::Dup)?;
    let _ = unistd::close(fd);
    Ok(())
}

/// 隣り合う 2 ステージをつなぐパイプ。
///
/// 作成したプロセス自身は読み書きしない。fork 後、親は [`close`](Pipe::close) で両端を閉じ、
/// 左の子は [`attach_write_end`](Pipe::attach_write_end)、右の子は
/// [`attach_read_end`](Pipe::attach_read_end) を呼ぶ。どちらも両端の raw fd を閉じる。
/// 書き込み端が不要なプロセスに残っていると、読み手は EOF を受け取れずブロックし続ける。
#[derive(Debug)]
pub struct Pipe {
    read: RawFd,
    write: RawFd,
}

impl Pipe {
    pub fn open() -> Result<Self, ShellError> {
        let (read, write) = unistd::pipe().map_err(ShellError::Pipe)?;
        Ok(Self {
            read: read.into_raw_fd(),
            write: write.into_raw_fd(),
        })
    }

    /// 書き込み端を stdout に付け替え、両端を閉じる（左ステージの子で呼ぶ）。
    pub fn attach_write_end(&self) -> Result<(), ShellError> {
        self.attach(self.write, libc::STDOUT_FILENO)
    }

    /// 読み取り端を stdin に付け替え、両端を閉じる（右ステージの子で呼ぶ）。
    pub fn attach_read_end(&self) -> Result<(), ShellError> {
        self.attach(self.read, libc::STDIN_FILENO)
    }

    fn attach(&self, end: RawFd, target: RawFd) -> Result<(), ShellError> {
        unistd::dup2(end, target).map_err(ShellError::Dup)?;
        // pipe() が空いていた 0/1 番を返した場合、付け替え先は閉じない
        for fd in [self.read, self.write] {
            if fd != target {
                let _ = unistd::close(fd);
            }
        }
        Ok(())
    }

    /// 両端を閉じる。
    pub fn close(&self) {
        let _ = unistd::close(self.read);
        let _ = unistd::close(self.write);
    }
}

// ── exec ──────────────────────────────────────────────────────────

/// `execvp` で現在のプロセスイメージを置き換える。環境変数はそのまま引き継ぐ。
///
/// 戻ってくるのは失敗したときだけなので、戻り値はエラーそのもの。
pub fn exec_replace(argv: &[String]) -> ShellError {
    let command = argv.first().cloned().unwrap_or_default();
    let args: Vec<CString> = match argv.iter().map(|a| CString::new(a.as_str())).collect() {
        Ok(args) => args,
        Err(_) => {
            return ShellError::Exec {
                command,
                errno: Errno::EINVAL,
            }
        }
    };
    let Some(program) = args.first() else {
        return ShellError::Exec {
            command,
            errno: Errno::ENOENT,
        };
    };

    match execvp(program, &args) {
        Ok(never) => match never {},
        Err(errno) => ShellError::Exec { command, errno },
    }
}
