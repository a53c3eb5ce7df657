//! トークナイザ + ディレクティブパーサー: 入力行からコマンドツリーを構築する。
//!
//! 1. [`tokenize`] — 空白（スペース、タブ、CR、LF、BEL）で分割するだけ。クォートやエスケープは解釈しない。
//! 2. `;` でセグメントに、各セグメントを `|` でステージに分割する（`;` が先）。
//! 3. 各ステージに [`extract_directives`] を適用し、リダイレクト先・`&`・ワイルドカード位置を
//!    ステージ固有の [`Directives`] として取り出す。
//!
//! 結果は 1 本の [`CommandTree`]（`Simple` / `Pipeline` / `Sequence`）にまとめられ、
//! executor はトークン列を再スキャンせずにツリーをそのまま解釈する。
//!
//! ## 対応構文
//!
//! - リダイレクト: `< path`, `> path`（トークン先頭の文字で判定し、次のトークンをパスとして消費）
//! - バックグラウンド実行: `&`（どのステージに現れても行全体が対象）
//! - 順次実行: `a ; b ; c`（単独トークンの `;`）
//! - パイプライン: `a | b | c`（単独トークンの `|`）
//! - ワイルドカード: `*`, `?` を含む最初の引数（ステージごとに 1 つ）

use crate::error::ParseError;
use crate::glob;

/// トークン区切り文字。
const DELIMITERS: &[char] = &[' ', '\t', '\r', '\n', '\x07'];

/// 順次実行の区切りトークン。
pub const SEQUENCE_OP: &str = ";";
/// パイプラインの区切りトークン。
pub const PIPE_OP: &str = "|";

// ── AST ─────────────────────────────────────────────────────────────

/// ステージ単位のディレクティブ。パース時に 1 度だけ決まり、以後は読み取り専用。
///
/// fork 後の子プロセスはツリーのコピーを持つので、ステージ間で値が混ざることはない。
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Directives {
    /// `< path` — stdin をファイルから読む。複数指定時は最後が有効。
    pub input: Option<String>,
    /// `> path` — stdout をファイルへ書く（作成 + 切り詰め）。複数指定時は最後が有効。
    pub output: Option<String>,
    /// `&` が現れた。
    pub background: bool,
    /// 行に `;` が現れた。
    ///
    /// [`parse`] は単独トークンの `;` で先に分割するので、その場合は行内の全ステージに立てる。
    /// [`extract_directives`] 単体では `;` で始まるトークン（`;x` など）で立ち、トークンは引数列に残る。
    pub sequence_present: bool,
    /// `*` / `?` を含む最初の引数のインデックス（ディレクティブ除去後の引数列での位置）。
    pub wildcard: Option<usize>,
}

/// 単一コマンド。引数列は常に 1 要素以上。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleCommand {
    pub argv: Vec<String>,
    pub directives: Directives,
}

impl SimpleCommand {
    /// コマンド名（`argv[0]`）。
    pub fn program(&self) -> &str {
        &self.argv[0]
    }
}

/// コマンドツリー。パーサーが 1 行につき 1 本構築する。
///
/// 1 段のパイプラインは `Simple` に、1 セグメントの列は中身そのものに畳み込まれる。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandTree {
    /// 単一コマンド。
    Simple(SimpleCommand),
    /// `a | b | …`（2 段以上）。
    Pipeline(Vec<SimpleCommand>),
    /// `a ; b ; …`（2 セグメント以上）。要素は `Simple` か `Pipeline`。
    Sequence(Vec<CommandTree>),
}

impl CommandTree {
    /// ツリー内の全単一コマンドを出現順に返す。
    pub fn commands(&self) -> Vec<&SimpleCommand> {
        match self {
            Self::Simple(cmd) => vec![cmd],
            Self::Pipeline(stages) => stages.iter().collect(),
            Self::Sequence(segments) => segments.iter().flat_map(|s| s.commands()).collect(),
        }
    }
}

/// 1 行分のパース結果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub tree: CommandTree,
    /// いずれかのステージに `&` があれば `true`。行全体をバックグラウンドで実行する。
    pub background: bool,
}

impl CommandLine {
    /// `;` で区切られた複数セグメントを持つか。
    pub fn sequence_present(&self) -> bool {
        matches!(self.tree, CommandTree::Sequence(_))
    }

    /// パイプも `;` もない単一コマンドならそれを返す。
    pub fn as_simple(&self) -> Option<&SimpleCommand> {
        match &self.tree {
            CommandTree::Simple(cmd) => Some(cmd),
            _ => None,
        }
    }
}

// ── Tokenizer ───────────────────────────────────────────────────────

/// 入力行を空白で分割する。空白だけの行は空のベクタになる。
pub fn tokenize(line: &str) -> Vec<String> {
    line.split(DELIMITERS)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn is_separator(token: &str) -> bool {
    token == SEQUENCE_OP || token == PIPE_OP
}

// ── Directive parser ────────────────────────────────────────────────

/// トークン列からディレクティブを取り出し、消費したトークンを取り除く。
///
/// 1 パス目はトークンの先頭文字で分類する:
/// - `<` / `>` — 次のトークンをパスとして消費（演算子とパスの両方を除去）
/// - `&` — バックグラウンドフラグを立てて除去
/// - `;` — 順次実行ありと記録（トークンは残す）
///
/// 2 パス目は残ったトークンから `*` / `?` を含む最初のものの位置を記録する。
///
/// エラー時 `tokens` の内容は未規定（行ごと破棄される前提）。
pub fn extract_directives(tokens: &mut Vec<String>) -> Result<Directives, ParseError> {
    let mut directives = Directives::default();
    let mut kept = Vec::with_capacity(tokens.len());
    let mut iter = std::mem::take(tokens).into_iter();

    while let Some(token) = iter.next() {
        match token.chars().next() {
            Some(op @ ('<' | '>')) => {
                let target = match iter.next() {
                    Some(path) if !is_separator(&path) => path,
                    _ => return Err(ParseError::MissingRedirectTarget(op)),
                };
                if op == '<' {
                    directives.input = Some(target);
                } else {
                    directives.output = Some(target);
                }
            }
            Some('&') => directives.background = true,
            Some(';') => {
                directives.sequence_present = true;
                kept.push(token);
            }
            _ => kept.push(token),
        }
    }

    directives.wildcard = kept.iter().position(|t| glob::has_glob_chars(t));
    *tokens = kept;
    Ok(directives)
}

// ── Parser ──────────────────────────────────────────────────────────

/// 入力行をパースして [`CommandLine`] を返す。
///
/// - 空行・`;` のみの行 → `Ok(None)`
/// - 正常なコマンド → `Ok(Some(CommandLine))`
/// - 構文エラー → `Err(ParseError)`
///
/// 先頭・末尾・連続した `;` による空セグメントは読み飛ばす（bash 互換）。
pub fn parse(line: &str) -> Result<Option<CommandLine>, ParseError> {
    let tokens = tokenize(line);
    let sequence_present = tokens.iter().any(|t| t == SEQUENCE_OP);
    let mut segments = Vec::new();
    let mut background = false;

    for segment in tokens.split(|t| t == SEQUENCE_OP) {
        if segment.is_empty() {
            continue;
        }
        let mut stages = Vec::new();
        for stage in segment.split(|t| t == PIPE_OP) {
            if stage.is_empty() {
                return Err(ParseError::EmptyPipelineSegment);
            }
            let mut argv = stage.to_vec();
            let mut directives = extract_directives(&mut argv)?;
            directives.sequence_present |= sequence_present;
            if argv.is_empty() {
                return Err(ParseError::MissingCommand);
            }
            background |= directives.background;
            stages.push(SimpleCommand { argv, directives });
        }
        segments.push(pipeline_node(stages));
    }

    let tree = match segments.len() {
        0 => return Ok(None),
        1 => match segments.pop() {
            Some(only) => only,
            None => return Ok(None),
        },
        _ => CommandTree::Sequence(segments),
    };

    Ok(Some(CommandLine { tree, background }))
}

/// ステージ列をツリーノードにする。1 段なら `Simple`。
fn pipeline_node(mut stages: Vec<SimpleCommand>) -> CommandTree {
    if stages.len() == 1 {
        if let Some(only) = stages.pop() {
            return CommandTree::Simple(only);
        }
    }
    CommandTree::Pipeline(stages)
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    /// パース結果の各単一コマンドの引数を出現順に取り出す。
    fn parse_args(input: &str) -> Vec<Vec<String>> {
        let line = parse(input).unwrap().unwrap();
        line.tree
            .commands()
            .iter()
            .map(|cmd| cmd.argv.clone())
            .collect()
    }

    fn simple(input: &str) -> SimpleCommand {
        let line = parse(input).unwrap().unwrap();
        line.as_simple().cloned().expect("single command")
    }

    // ── トークナイザ ──

    #[test]
    fn tokenize_splits_on_whitespace() {
        assert_eq!(tokenize("ls  -l\t/tmp\n"), strings(&["ls", "-l", "/tmp"]));
    }

    #[test]
    fn tokenize_rejoin_reproduces_tokens() {
        let line = "  cat <in.txt   | sort\t> out.txt ; echo   done  ";
        let tokens = tokenize(line);
        let rejoined = tokens.join(" ");
        assert_eq!(tokenize(&rejoined), tokens);
        assert_eq!(rejoined, "cat <in.txt | sort > out.txt ; echo done");
    }

    #[test]
    fn tokenize_bell_is_delimiter() {
        assert_eq!(tokenize("a\x07b"), strings(&["a", "b"]));
    }

    #[test]
    fn tokenize_blank_line() {
        assert!(tokenize(" \t\r\n").is_empty());
    }

    // ── ディレクティブ ──

    #[test]
    fn output_redirect_is_elided() {
        let mut tokens = strings(&["cmd", ">", "out.txt"]);
        let d = extract_directives(&mut tokens).unwrap();
        assert_eq!(d.output.as_deref(), Some("out.txt"));
        assert_eq!(d.input, None);
        assert_eq!(tokens, strings(&["cmd"]));
    }

    #[test]
    fn input_redirect_is_elided() {
        let mut tokens = strings(&["sort", "<", "in.txt", "-r"]);
        let d = extract_directives(&mut tokens).unwrap();
        assert_eq!(d.input.as_deref(), Some("in.txt"));
        assert_eq!(tokens, strings(&["sort", "-r"]));
    }

    #[test]
    fn operator_classified_by_first_char() {
        // `>>` も先頭が `>` なので出力リダイレクト（追記ではなく切り詰め）
        let mut tokens = strings(&["echo", "hi", ">>", "log"]);
        let d = extract_directives(&mut tokens).unwrap();
        assert_eq!(d.output.as_deref(), Some("log"));
        assert_eq!(tokens, strings(&["echo", "hi"]));
    }

    #[test]
    fn last_redirect_wins() {
        let mut tokens = strings(&["cmd", ">", "a", ">", "b"]);
        let d = extract_directives(&mut tokens).unwrap();
        assert_eq!(d.output.as_deref(), Some("b"));
    }

    #[test]
    fn background_token_removed() {
        let mut tokens = strings(&["sleep", "1", "&"]);
        let d = extract_directives(&mut tokens).unwrap();
        assert!(d.background);
        assert_eq!(tokens, strings(&["sleep", "1"]));
    }

    #[test]
    fn semicolon_recorded_but_kept() {
        let mut tokens = strings(&["a", ";", "b"]);
        let d = extract_directives(&mut tokens).unwrap();
        assert!(d.sequence_present);
        assert_eq!(tokens, strings(&["a", ";", "b"]));
    }

    #[test]
    fn leading_semicolon_token_marks_sequence() {
        let line = parse("echo ;x").unwrap().unwrap();
        let cmd = line.as_simple().unwrap();
        assert_eq!(cmd.argv, strings(&["echo", ";x"]));
        assert!(cmd.directives.sequence_present);
        assert!(!line.sequence_present());
    }

    #[test]
    fn sequence_flag_set_on_every_stage() {
        let line = parse("a | b ; c").unwrap().unwrap();
        assert!(line.tree.commands().iter().all(|c| c.directives.sequence_present));

        let line = parse("a | b").unwrap().unwrap();
        assert!(line.tree.commands().iter().all(|c| !c.directives.sequence_present));
    }

    #[test]
    fn trailing_semicolon_marks_sequence() {
        let line = parse("echo a ;").unwrap().unwrap();
        assert!(line.as_simple().unwrap().directives.sequence_present);
    }

    #[test]
    fn wildcard_first_match_wins() {
        let mut tokens = strings(&["ls", "-l", "*.txt", "?.rs"]);
        let d = extract_directives(&mut tokens).unwrap();
        assert_eq!(d.wildcard, Some(2));
    }

    #[test]
    fn wildcard_index_after_elision() {
        let mut tokens = strings(&["cat", "<", "in", "f?.txt"]);
        let d = extract_directives(&mut tokens).unwrap();
        assert_eq!(tokens, strings(&["cat", "f?.txt"]));
        assert_eq!(d.wildcard, Some(1));
    }

    #[test]
    fn no_wildcard() {
        let mut tokens = strings(&["echo", "plain"]);
        assert_eq!(extract_directives(&mut tokens).unwrap().wildcard, None);
    }

    #[test]
    fn err_redirect_without_target() {
        let mut tokens = strings(&["cmd", ">"]);
        assert_eq!(
            extract_directives(&mut tokens),
            Err(ParseError::MissingRedirectTarget('>'))
        );
    }

    #[test]
    fn err_redirect_followed_by_separator() {
        let mut tokens = strings(&["cmd", "<", ";", "b"]);
        assert_eq!(
            extract_directives(&mut tokens),
            Err(ParseError::MissingRedirectTarget('<'))
        );
    }

    // ── ツリー構築 ──

    #[test]
    fn simple_command() {
        assert_eq!(parse_args("echo hello world"), vec![strings(&["echo", "hello", "world"])]);
    }

    #[test]
    fn empty_input() {
        assert_eq!(parse(""), Ok(None));
        assert_eq!(parse("   \n"), Ok(None));
    }

    #[test]
    fn only_semicolons() {
        assert_eq!(parse("; ;"), Ok(None));
    }

    #[test]
    fn redirect_parses_to_output_directive() {
        let cmd = simple("cmd > out.txt");
        assert_eq!(cmd.argv, strings(&["cmd"]));
        assert_eq!(
            cmd.directives,
            Directives {
                output: Some("out.txt".to_string()),
                ..Directives::default()
            }
        );
    }

    #[test]
    fn three_stage_pipeline() {
        let line = parse("a | b | c").unwrap().unwrap();
        match &line.tree {
            CommandTree::Pipeline(stages) => {
                let names: Vec<&str> = stages.iter().map(|s| s.program()).collect();
                assert_eq!(names, vec!["a", "b", "c"]);
            }
            other => panic!("expected pipeline, got {:?}", other),
        }
        assert!(!line.sequence_present());
    }

    #[test]
    fn sequence_of_pipelines() {
        let line = parse("a | b ; c").unwrap().unwrap();
        assert!(line.sequence_present());
        match &line.tree {
            CommandTree::Sequence(segments) => {
                assert_eq!(segments.len(), 2);
                assert!(matches!(segments[0], CommandTree::Pipeline(ref s) if s.len() == 2));
                assert!(matches!(segments[1], CommandTree::Simple(ref c) if c.program() == "c"));
            }
            other => panic!("expected sequence, got {:?}", other),
        }
    }

    #[test]
    fn sequence_split_before_pipe() {
        assert_eq!(
            parse_args("x | y ; z | w"),
            vec![
                strings(&["x"]),
                strings(&["y"]),
                strings(&["z"]),
                strings(&["w"]),
            ]
        );
    }

    #[test]
    fn directives_are_per_stage() {
        let line = parse("a ; b > out.txt").unwrap().unwrap();
        let cmds = line.tree.commands();
        assert_eq!(cmds[0].directives.output, None);
        assert_eq!(cmds[1].directives.output.as_deref(), Some("out.txt"));
    }

    #[test]
    fn pipeline_redirects_stay_on_their_stage() {
        let line = parse("cat < in | sort > out").unwrap().unwrap();
        let cmds = line.tree.commands();
        assert_eq!(cmds[0].directives.input.as_deref(), Some("in"));
        assert_eq!(cmds[0].directives.output, None);
        assert_eq!(cmds[1].directives.input, None);
        assert_eq!(cmds[1].directives.output.as_deref(), Some("out"));
    }

    #[test]
    fn background_applies_to_line() {
        let line = parse("a ; b &").unwrap().unwrap();
        assert!(line.background);
        let cmds = line.tree.commands();
        assert!(!cmds[0].directives.background);
        assert!(cmds[1].directives.background);
    }

    #[test]
    fn no_background_flag() {
        assert!(!parse("sleep 1").unwrap().unwrap().background);
    }

    #[test]
    fn background_in_middle_keeps_args() {
        assert_eq!(parse_args("a & b"), vec![strings(&["a", "b"])]);
    }

    #[test]
    fn leading_and_trailing_semicolons_skipped() {
        assert_eq!(parse_args("; a ;"), vec![strings(&["a"])]);
        assert_eq!(parse_args("a ; ; b"), vec![strings(&["a"]), strings(&["b"])]);
    }

    #[test]
    fn attached_semicolon_is_an_argument() {
        // `;` は単独トークンのときだけ区切りになる
        let cmd = simple("echo a;");
        assert_eq!(cmd.argv, strings(&["echo", "a;"]));
    }

    #[test]
    fn wildcard_per_stage() {
        let line = parse("ls *.txt | grep f?").unwrap().unwrap();
        let cmds = line.tree.commands();
        assert_eq!(cmds[0].directives.wildcard, Some(1));
        assert_eq!(cmds[1].directives.wildcard, Some(1));
    }

    #[test]
    fn err_leading_pipe() {
        assert_eq!(parse("| cmd"), Err(ParseError::EmptyPipelineSegment));
    }

    #[test]
    fn err_trailing_pipe() {
        assert_eq!(parse("cmd |"), Err(ParseError::EmptyPipelineSegment));
    }

    #[test]
    fn err_double_pipe() {
        assert_eq!(parse("a | | b"), Err(ParseError::EmptyPipelineSegment));
    }

    #[test]
    fn err_missing_redirect_target() {
        assert_eq!(parse("cmd >"), Err(ParseError::MissingRedirectTarget('>')));
        assert_eq!(parse("cmd < ; b"), Err(ParseError::MissingRedirectTarget('<')));
        assert_eq!(parse("cmd > | b"), Err(ParseError::MissingRedirectTarget('>')));
    }

    #[test]
    fn err_redirect_only() {
        assert_eq!(parse("> out"), Err(ParseError::MissingCommand));
    }

    #[test]
    fn err_bare_ampersand() {
        assert_eq!(parse("&"), Err(ParseError::MissingCommand));
    }
}
