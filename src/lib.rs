//! forksh ライブラリ — テスト・ベンチマーク用にモジュールを公開する。
//!
//! バイナリ本体は `main.rs` の REPL ループ。
//!
//! ## モジュール構成
//!
//! | モジュール | 役割 |
//! |-----------|------|
//! | [`parser`] | トークナイザ、ディレクティブ抽出（`<`, `>`, `&`, `;`, ワイルドカード位置）、コマンドツリー構築 |
//! | [`executor`] | コマンドツリーの実行（順次実行・パイプラインの再帰 fork、コマンド起動、ビルトイン高速パス） |
//! | [`builtins`] | ビルトイン（`cd`, `history`, `exit`） |
//! | [`glob`] | パス名展開（`glob(3)` に委譲） |
//! | [`history`] | セッション履歴（起動時に切り詰め、1 行ずつ追記） |
//! | [`job`] | バックグラウンドジョブの登録と回収 |
//! | [`process`] | fork / pipe / dup2 / exec / wait のラッパー（`nix`） |
//! | [`shell`] | シェルの状態（終了ステータス、履歴、ジョブテーブル） |
//! | [`config`] | 起動設定（`-c`、履歴ファイルのパス） |
//! | [`error`] | エラー型と終了ステータスへの対応 |

pub mod builtins;
pub mod config;
pub mod error;
pub mod executor;
pub mod glob;
pub mod history;
pub mod job;
pub mod parser;
pub mod process;
pub mod shell;
