//! シェルの実行状態を保持するモジュール。
//!
//! 行をまたいで残るのは履歴・ジョブテーブル・直前の終了ステータスだけ。
//! パース結果（ディレクティブ）は行ごとの値として executor に渡し、ここには置かない。

use crate::history::History;
use crate::job::JobTable;

/// シェルの実行状態。REPLループ全体で共有される。
pub struct Shell {
    /// 直前のコマンドの終了ステータス。プロンプト表示と `exit` のデフォルト値に使う。
    pub last_status: i32,
    /// `exit` ビルトインで true にセットされ、REPLループを終了させる。
    pub should_exit: bool,
    /// stdin が端末のとき true。プロンプトと EOF 時の改行を出す。
    pub interactive: bool,
    /// セッションの入力履歴。
    pub history: History,
    /// バックグラウンドジョブ。
    pub jobs: JobTable,
}

impl Shell {
    pub fn new(history: History, interactive: bool) -> Self {
        Self {
            last_status: 0,
            should_exit: false,
            interactive,
            history,
            jobs: JobTable::new(),
        }
    }

    /// プロンプト文字列。終了ステータスが非ゼロなら接頭辞に付ける。
    pub fn prompt(&self) -> String {
        if self.last_status == 0 {
            "forksh$ ".to_string()
        } else {
            format!("[{}] forksh$ ", self.last_status)
        }
    }
}
