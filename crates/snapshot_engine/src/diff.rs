//! Line-based unified diff, in the classic `---`/`+++`/`@@` layout.

/// Unchanged lines kept around each change.
const CONTEXT: usize = 3;

/// Upper bound on the LCS table for the differing middle section.
/// Beyond it the section is reported as a wholesale replacement.
const MAX_TABLE_CELLS: usize = 4_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Keep,
    Remove,
    Add,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Equal,
    Delete,
    Insert,
    Replace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Opcode {
    tag: Tag,
    a_start: usize,
    a_end: usize,
    b_start: usize,
    b_end: usize,
}

/// Diff `previous` against `current` line by line.
///
/// Lines of the result are joined with `\n` without a trailing newline.
/// Identical inputs give an empty string.
pub fn unified_diff(previous: &str, current: &str, from_label: &str, to_label: &str) -> String {
    let a = split_lines(previous);
    let b = split_lines(current);

    let groups = group_opcodes(opcodes(&a, &b), CONTEXT);
    if groups.is_empty() {
        return String::new();
    }

    let mut out = vec![format!("--- {from_label}"), format!("+++ {to_label}")];
    for group in &groups {
        let (Some(first), Some(last)) = (group.first(), group.last()) else {
            continue;
        };
        out.push(format!(
            "@@ -{} +{} @@",
            format_range(first.a_start, last.a_end),
            format_range(first.b_start, last.b_end)
        ));
        for op in group {
            if op.tag == Tag::Equal {
                out.extend(a[op.a_start..op.a_end].iter().map(|line| format!(" {line}")));
                continue;
            }
            out.extend(a[op.a_start..op.a_end].iter().map(|line| format!("-{line}")));
            out.extend(b[op.b_start..op.b_end].iter().map(|line| format!("+{line}")));
        }
    }
    out.join("\n")
}

/// Split on every line boundary a text page may use, terminators dropped:
/// `\n`, `\r\n`, a lone `\r`, the ASCII vertical tab/form feed/separators,
/// NEL and the Unicode line/paragraph separators. A trailing boundary does
/// not start an extra empty line.
fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((idx, c)) = chars.next() {
        let end = match c {
            '\r' => match chars.peek() {
                Some((_, '\n')) => {
                    chars.next();
                    idx + 2
                }
                _ => idx + 1,
            },
            '\n' | '\x0b' | '\x0c' | '\x1c' | '\x1d' | '\x1e' | '\u{85}' | '\u{2028}'
            | '\u{2029}' => idx + c.len_utf8(),
            _ => continue,
        };
        lines.push(&text[start..idx]);
        start = end;
    }
    if start < text.len() {
        lines.push(&text[start..]);
    }
    lines
}

/// `start,len` with 1-based start; a single line is just its number,
/// an empty range points at the line before it.
fn format_range(start: usize, end: usize) -> String {
    let len = end - start;
    match len {
        0 => format!("{start},0"),
        1 => format!("{}", start + 1),
        _ => format!("{},{len}", start + 1),
    }
}

fn opcodes(a: &[&str], b: &[&str]) -> Vec<Opcode> {
    let prefix = a.iter().zip(b).take_while(|(x, y)| x == y).count();
    let max_suffix = a.len().min(b.len()) - prefix;
    let suffix = a
        .iter()
        .rev()
        .zip(b.iter().rev())
        .take(max_suffix)
        .take_while(|(x, y)| x == y)
        .count();

    let mut steps = vec![Step::Keep; prefix];
    steps.extend(edit_script(
        &a[prefix..a.len() - suffix],
        &b[prefix..b.len() - suffix],
    ));
    steps.extend(std::iter::repeat(Step::Keep).take(suffix));
    collapse(&steps)
}

fn edit_script(a: &[&str], b: &[&str]) -> Vec<Step> {
    let (n, m) = (a.len(), b.len());
    let fits = n
        .checked_add(1)
        .zip(m.checked_add(1))
        .and_then(|(rows, cols)| rows.checked_mul(cols))
        .is_some_and(|cells| cells <= MAX_TABLE_CELLS);
    if !fits {
        let mut steps = vec![Step::Remove; n];
        steps.extend(std::iter::repeat(Step::Add).take(m));
        return steps;
    }

    // table[i * width + j] = LCS length of a[i..] and b[j..]
    let width = m + 1;
    let mut table = vec![0u32; (n + 1) * width];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            table[i * width + j] = if a[i] == b[j] {
                table[(i + 1) * width + j + 1] + 1
            } else {
                table[(i + 1) * width + j].max(table[i * width + j + 1])
            };
        }
    }

    let mut steps = Vec::with_capacity(n + m);
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if a[i] == b[j] {
            steps.push(Step::Keep);
            i += 1;
            j += 1;
        } else if table[(i + 1) * width + j] >= table[i * width + j + 1] {
            steps.push(Step::Remove);
            i += 1;
        } else {
            steps.push(Step::Add);
            j += 1;
        }
    }
    steps.extend(std::iter::repeat(Step::Remove).take(n - i));
    steps.extend(std::iter::repeat(Step::Add).take(m - j));
    steps
}

/// Merge per-line steps into ranges. A run of removals and additions between
/// two kept lines becomes a single opcode.
fn collapse(steps: &[Step]) -> Vec<Opcode> {
    let mut ops = Vec::new();
    let (mut i, mut j) = (0, 0);
    let mut run_start = (0, 0);
    let mut run_is_equal: Option<bool> = None;

    for step in steps {
        let is_equal = *step == Step::Keep;
        if let Some(current) = run_is_equal.filter(|current| *current != is_equal) {
            ops.push(range_opcode(current, run_start, (i, j)));
            run_start = (i, j);
        }
        run_is_equal = Some(is_equal);
        match step {
            Step::Keep => {
                i += 1;
                j += 1;
            }
            Step::Remove => i += 1,
            Step::Add => j += 1,
        }
    }
    if let Some(current) = run_is_equal {
        ops.push(range_opcode(current, run_start, (i, j)));
    }
    ops
}

fn range_opcode(
    equal: bool,
    (a_start, b_start): (usize, usize),
    (a_end, b_end): (usize, usize),
) -> Opcode {
    let tag = match (equal, a_end > a_start, b_end > b_start) {
        (true, _, _) | (false, false, false) => Tag::Equal,
        (false, true, true) => Tag::Replace,
        (false, true, false) => Tag::Delete,
        (false, false, true) => Tag::Insert,
    };
    Opcode {
        tag,
        a_start,
        a_end,
        b_start,
        b_end,
    }
}

/// Split opcodes into hunks, each change padded with up to `context` equal lines.
fn group_opcodes(mut codes: Vec<Opcode>, context: usize) -> Vec<Vec<Opcode>> {
    if codes.iter().all(|op| op.tag == Tag::Equal) {
        return Vec::new();
    }

    if let Some(first) = codes.first_mut().filter(|op| op.tag == Tag::Equal) {
        first.a_start = first.a_start.max(first.a_end.saturating_sub(context));
        first.b_start = first.b_start.max(first.b_end.saturating_sub(context));
    }
    if let Some(last) = codes.last_mut().filter(|op| op.tag == Tag::Equal) {
        last.a_end = last.a_end.min(last.a_start + context);
        last.b_end = last.b_end.min(last.b_start + context);
    }

    let mut groups = Vec::new();
    let mut group = Vec::new();
    for mut op in codes {
        if op.tag == Tag::Equal && op.a_end - op.a_start > context * 2 {
            group.push(Opcode {
                a_end: op.a_start + context,
                b_end: op.b_start + context,
                ..op
            });
            groups.push(std::mem::take(&mut group));
            op.a_start = op.a_end - context;
            op.b_start = op.b_end - context;
        }
        group.push(op);
    }
    if !(group.is_empty() || (group.len() == 1 && group[0].tag == Tag::Equal)) {
        groups.push(group);
    }
    groups
}
