//! forksh — 演算子（`<`, `>`, `&`, `;`, `|`, `*`/`?`）を解釈し、プロセス木として実行するシェル
//!
//! REPLループ: プロンプト表示 → 1 行読み取り → 履歴に記録 → パース → 実行 → ループ
//!
//! - stdin が端末のときだけプロンプトを出す（パイプ入力ではコマンド出力だけが stdout に出る）
//! - EOF で正常終了（ステータス 0）
//! - `-c LINE` は 1 行だけ実行し、その終了ステータスで終了する

use std::io::{self, BufRead, Write};

use forksh::config::Config;
use forksh::error::ShellError;
use forksh::executor;
use forksh::history::History;
use forksh::parser;
use forksh::shell::Shell;

/// 1 行を記録・パース・実行し、`shell.last_status` を更新する。
///
/// fork 失敗はシェルを続行できないので、その場で終了する。
fn run_line(shell: &mut Shell, line: &str) {
    if let Err(e) = shell.history.add(line) {
        eprintln!("forksh: {}: {}", shell.history.path().display(), e);
    }

    match parser::parse(line) {
        Ok(Some(cmd)) => match executor::execute(shell, &cmd, line) {
            Ok(status) => shell.last_status = status,
            Err(e) if e.is_fatal() => {
                eprintln!("forksh: {}", e);
                std::process::exit(e.exit_status());
            }
            Err(e) => {
                eprintln!("forksh: {}", e);
                shell.last_status = e.exit_status();
            }
        },
        Ok(None) => {}
        Err(e) => {
            let e = ShellError::from(e);
            eprintln!("forksh: {}", e);
            shell.last_status = e.exit_status();
        }
    }
}

/// stdin から 1 行ずつ読んで実行する。戻り値はシェルの終了ステータス。
fn repl(shell: &mut Shell) -> i32 {
    let stdin = io::stdin();
    let mut buf = Vec::new();

    loop {
        // プロンプト前にバックグラウンドジョブを reap し、完了通知を出力
        shell.jobs.reap_and_notify();

        if shell.interactive {
            print!("{}", shell.prompt());
            let _ = io::stdout().flush();
        }

        // UTF-8 として不正なバイトは U+FFFD に置き換え、行を落とさない
        buf.clear();
        match stdin.lock().read_until(b'\n', &mut buf) {
            Ok(0) => {
                // EOF (Ctrl+D): 改行を出力して正常終了
                if shell.interactive {
                    println!();
                }
                return 0;
            }
            Ok(_) => run_line(shell, &String::from_utf8_lossy(&buf)),
            Err(e) => {
                eprintln!("forksh: read error: {}", e);
                return 1;
            }
        }

        if shell.should_exit {
            return shell.last_status;
        }
    }
}

fn main() {
    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("forksh: {}", e);
            std::process::exit(e.exit_status());
        }
    };

    let history = match History::create(&config.history_path) {
        Ok(h) => h,
        Err(e) => {
            eprintln!("forksh: {}: {}", config.history_path.display(), e);
            std::process::exit(1);
        }
    };

    let interactive =
        config.command.is_none() && unsafe { libc::isatty(libc::STDIN_FILENO) } == 1;
    let mut shell = Shell::new(history, interactive);

    let status = match &config.command {
        Some(line) => {
            run_line(&mut shell, line);
            shell.last_status
        }
        None => repl(&mut shell),
    };

    std::process::exit(status);
}
