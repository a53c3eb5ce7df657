//! パス名展開（glob）: `*`, `?` を含む引数を OS の `glob(3)` で展開する。
//!
//! マッチング自体は libc に委ね、ここでは結果の取り出しと引数列への差し込みだけを行う。
//! マッチ順序は `glob(3)` が返す順（通常は辞書順）。
//!
//! マッチなし → 元のパターンを 1 引数としてそのまま渡す（コマンドを黙って落とさない）。

use std::ffi::{CStr, CString};

/// パターンにワイルドカード文字（`*`, `?`）が含まれるか判定する。
pub fn has_glob_chars(s: &str) -> bool {
    s.bytes().any(|b| b == b'*' || b == b'?')
}

// ── GlobResults ───────────────────────────────────────────────────

/// `glob_t` の RAII ラッパー。Drop で自動 `globfree`。
struct GlobResults {
    inner: libc::glob_t,
}

impl GlobResults {
    fn new() -> Self {
        unsafe {
            let results: libc::glob_t = std::mem::zeroed();
            Self { inner: results }
        }
    }

    /// `glob(3)` を実行する。1 件以上マッチすれば `true`。
    /// `GLOB_NOMATCH` や読み取りエラーはすべて `false`。
    fn search(&mut self, pattern: &CStr) -> bool {
        unsafe { libc::glob(pattern.as_ptr(), 0, None, &mut self.inner) == 0 }
    }

    /// マッチしたパスを `glob(3)` の順序で返す。
    fn paths(&self) -> Vec<String> {
        let count = self.inner.gl_pathc as usize;
        let mut paths = Vec::with_capacity(count);
        for i in 0..count {
            let ptr = unsafe { *self.inner.gl_pathv.add(i) };
            if ptr.is_null() {
                break;
            }
            let path = unsafe { CStr::from_ptr(ptr) };
            paths.push(path.to_string_lossy().into_owned());
        }
        paths
    }
}

impl Drop for GlobResults {
    fn drop(&mut self) {
        unsafe {
            libc::globfree(&mut self.inner);
        }
    }
}

// ── 展開 ──────────────────────────────────────────────────────────

/// パターンを展開し、マッチしたパスを返す。
/// マッチなし → 元のパターンを含む Vec を返す。
pub fn expand(pattern: &str) -> Vec<String> {
    let c_pattern = match CString::new(pattern) {
        Ok(p) => p,
        Err(_) => return vec![pattern.to_string()], // NUL を含むパターンは照合しない
    };

    let mut results = GlobResults::new();
    let matches = if results.search(&c_pattern) {
        results.paths()
    } else {
        Vec::new()
    };

    if matches.is_empty() {
        vec![pattern.to_string()]
    } else {
        matches
    }
}

/// `argv[index]` を展開結果で置き換えた新しい引数列を返す。
///
/// `index` より前と後ろの引数はそのまま残る。`index` が範囲外なら `argv` のコピーを返す。
/// `index == 0` ならコマンド名自体も展開され、先頭のマッチが実行されるプログラムになる。
pub fn expand_argv(argv: &[String], index: usize) -> Vec<String> {
    let Some(pattern) = argv.get(index) else {
        return argv.to_vec();
    };
    let expanded = expand(pattern);
    let mut result = Vec::with_capacity(argv.len() - 1 + expanded.len());
    result.extend_from_slice(&argv[..index]);
    result.extend(expanded);
    result.extend_from_slice(&argv[index + 1..]);
    result
}
