//! バックグラウンドジョブのテーブル。
//!
//! `&` 付きの行はトップレベルの子を待たずにここへ登録し、プロンプト表示前に
//! [`JobTable::reap_and_notify`] で終了したものを回収・通知する。
//! ジョブ制御（`fg` / `bg`、停止・再開、端末の受け渡し）は行わない。

use nix::unistd::Pid;

use crate::process;

/// バックグラウンドで実行中の 1 行。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// `[N]` 形式で表示されるジョブ番号。最小未使用 ID が割り当てられる。
    pub id: usize,
    /// トップレベルの子プロセスの PID。
    pub pid: Pid,
    /// 表示用コマンド文字列（ユーザ入力から末尾の `&` を除いたもの）。
    pub command: String,
}

/// ジョブテーブル。[`Shell`](crate::shell::Shell) が所有する。
#[derive(Debug, Default)]
pub struct JobTable {
    jobs: Vec<Job>,
}

impl JobTable {
    pub fn new() -> Self {
        Self { jobs: Vec::new() }
    }

    /// ジョブを追加し、割り当てた ID を返す。最小未使用 ID を再利用する。
    pub fn insert(&mut self, pid: Pid, command: &str) -> usize {
        let mut id = 1;
        while self.jobs.iter().any(|j| j.id == id) {
            id += 1;
        }
        let trimmed = command.trim();
        let display = trimmed.strip_suffix('&').unwrap_or(trimmed).trim_end();
        self.jobs.push(Job {
            id,
            pid,
            command: display.to_string(),
        });
        id
    }

    /// 終了済みのジョブを非ブロッキングで回収し、`(ジョブ, 終了ステータス)` を返す。
    ///
    /// `waitpid` が失敗したジョブ（既に回収済みなど）もテーブルから外す。
    pub fn reap(&mut self) -> Vec<(Job, i32)> {
        let mut done = Vec::new();
        let mut running = Vec::with_capacity(self.jobs.len());
        for job in self.jobs.drain(..) {
            match process::try_wait(job.pid) {
                Ok(None) => running.push(job),
                Ok(Some(status)) => done.push((job, status)),
                Err(e) => {
                    let status = e.exit_status();
                    done.push((job, status));
                }
            }
        }
        self.jobs = running;
        done
    }

    /// 終了済みジョブを回収し、`[N]+  Done    command` 形式で stderr に通知する。
    pub fn reap_and_notify(&mut self) {
        for (job, status) in self.reap() {
            if status == 0 {
                eprintln!("[{}]+  Done    {}", job.id, job.command);
            } else {
                eprintln!("[{}]+  Exit {}  {}", job.id, status, job.command);
            }
        }
    }
}
