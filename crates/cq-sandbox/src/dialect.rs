use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::{Captures, Regex};

struct Rewrite {
    pattern: Regex,
    replacement: &'static str,
}

/// Marks the opening brace of a body whose closing brace must also end the
/// closure assignment.
const CLOSURE_BODY: char = '\u{1}';

const ASSIGN_TARGET: &str = r"[A-Za-z_]\w*(?:\.[A-Za-z_]\w*|\[[^\]\n]*\])*";

fn rewrites() -> &'static [Rewrite] {
    static REWRITES: OnceLock<Vec<Rewrite>> = OnceLock::new();
    REWRITES.get_or_init(|| {
        let increment = format!(r"({})[ \t]*\+\+", ASSIGN_TARGET);
        let pre_increment = format!(r"\+\+[ \t]*({})", ASSIGN_TARGET);
        let decrement = format!(r"({})[ \t]*--", ASSIGN_TARGET);
        let pre_decrement = format!(r"--[ \t]*({})", ASSIGN_TARGET);
        let divide_assign = format!(r"({})[ \t]*/=[ \t]*([^;\n}}]+)", ASSIGN_TARGET);
        [
            (increment.as_str(), "${1} += 1"),
            (pre_increment.as_str(), "${1} += 1"),
            (decrement.as_str(), "${1} -= 1"),
            (pre_decrement.as_str(), "${1} -= 1"),
            (divide_assign.as_str(), "${1} = ${1} / (${2})"),
            (r"\bconsole\s*\.\s*log\s*\(", "print("),
            (r"\bfunction\b", "fn"),
            (r"\bvar\b", "let"),
            (r"!==", "!="),
            (r"===", "=="),
            (r"\b(?:undefined|null)\b", "()"),
        ]
        .into_iter()
        .map(|(pattern, replacement)| Rewrite {
            pattern: Regex::new(pattern).expect("dialect rewrite regex should compile"),
            replacement,
        })
        .collect()
    })
}

fn named_function() -> &'static Regex {
    static NAMED: OnceLock<Regex> = OnceLock::new();
    NAMED.get_or_init(|| {
        Regex::new(r"\bfunction[ \t]+([A-Za-z_]\w*)(\s*)\(([^)]*)\)(\s*)\{")
            .expect("named function regex should compile")
    })
}

fn anonymous_function() -> &'static Regex {
    static ANONYMOUS: OnceLock<Regex> = OnceLock::new();
    ANONYMOUS.get_or_init(|| {
        Regex::new(r"\bfunction(\s*)\(([^)]*)\)(\s*)\{")
            .expect("anonymous function regex should compile")
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment {
    Code,
    DoubleQuoted,
    SingleQuoted,
    Backtick,
    LineComment,
    BlockComment,
}

enum Piece {
    Code(String),
    Verbatim(String),
}

/// Rewrites the JavaScript-flavoured lesson dialect into Rhai. Only code
/// outside string literals and comments is touched, and every newline is kept
/// so evaluator positions still point at the learner's lines.
///
/// Named functions become closures assigned to variables declared at the top
/// of the program, so their bodies can read top-level bindings and each
/// other. Calls to them go through `call(name, ..)`, which reads the closure
/// without locking it, so a body may call itself.
pub fn rewrite_dialect(source: &str) -> String {
    let pieces = split_pieces(source);
    let functions = declared_functions(&pieces);

    let mut out = String::with_capacity(source.len() + 16);
    for name in &functions {
        out.push_str(&format!("let {} = (); ", name));
    }
    let mut braces = Vec::new();
    for piece in pieces {
        match piece {
            Piece::Verbatim(text) => out.push_str(&text),
            Piece::Code(text) => {
                let rewritten = rewrite_code(&text, &functions);
                close_bodies(&rewritten, &mut braces, &mut out);
            }
        }
    }
    out
}

fn split_pieces(source: &str) -> Vec<Piece> {
    let mut pieces = Vec::new();
    let mut code = String::new();
    let mut verbatim = String::new();
    let mut segment = Segment::Code;
    let mut chars = source.chars().peekable();

    while let Some(ch) = chars.next() {
        match segment {
            Segment::Code => match ch {
                '"' | '\'' | '`' => {
                    flush(&mut code, &mut pieces, Piece::Code);
                    segment = match ch {
                        '"' => Segment::DoubleQuoted,
                        '\'' => Segment::SingleQuoted,
                        _ => Segment::Backtick,
                    };
                    verbatim.push(if ch == '\'' { '"' } else { ch });
                }
                '/' if matches!(chars.peek(), Some('/') | Some('*')) => {
                    flush(&mut code, &mut pieces, Piece::Code);
                    let next = chars.next().unwrap_or('/');
                    segment = if next == '/' {
                        Segment::LineComment
                    } else {
                        Segment::BlockComment
                    };
                    verbatim.push(ch);
                    verbatim.push(next);
                }
                _ => {
                    flush(&mut verbatim, &mut pieces, Piece::Verbatim);
                    code.push(ch);
                }
            },
            Segment::DoubleQuoted | Segment::Backtick => {
                verbatim.push(ch);
                if ch == '\\' {
                    if let Some(escaped) = chars.next() {
                        verbatim.push(escaped);
                    }
                } else if (ch == '"' && segment == Segment::DoubleQuoted)
                    || (ch == '`' && segment == Segment::Backtick)
                {
                    segment = Segment::Code;
                }
            }
            Segment::SingleQuoted => match ch {
                '\\' => match chars.next() {
                    Some('\'') => verbatim.push('\''),
                    Some(escaped) => {
                        verbatim.push('\\');
                        verbatim.push(escaped);
                    }
                    None => verbatim.push('\\'),
                },
                '"' => verbatim.push_str("\\\""),
                '\'' => {
                    verbatim.push('"');
                    segment = Segment::Code;
                }
                _ => verbatim.push(ch),
            },
            Segment::LineComment => {
                verbatim.push(ch);
                if ch == '\n' {
                    segment = Segment::Code;
                }
            }
            Segment::BlockComment => {
                verbatim.push(ch);
                if ch == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    verbatim.push('/');
                    segment = Segment::Code;
                }
            }
        }
    }

    flush(&mut code, &mut pieces, Piece::Code);
    flush(&mut verbatim, &mut pieces, Piece::Verbatim);
    pieces
}

fn flush(buffer: &mut String, pieces: &mut Vec<Piece>, wrap: fn(String) -> Piece) {
    if !buffer.is_empty() {
        pieces.push(wrap(std::mem::take(buffer)));
    }
}

fn declared_functions(pieces: &[Piece]) -> BTreeSet<String> {
    pieces
        .iter()
        .filter_map(|piece| match piece {
            Piece::Code(text) => Some(text),
            Piece::Verbatim(_) => None,
        })
        .flat_map(|text| named_function().captures_iter(text))
        .map(|captures| captures[1].to_string())
        .collect()
}

fn rewrite_code(code: &str, functions: &BTreeSet<String>) -> String {
    let mut rewritten = named_function()
        .replace_all(code, |captures: &Captures| {
            format!(
                "{}{} = |{}|{}{}",
                &captures[1], &captures[2], &captures[3], &captures[4], CLOSURE_BODY
            )
        })
        .into_owned();
    rewritten = anonymous_function()
        .replace_all(&rewritten, |captures: &Captures| {
            format!(
                "{}|{}|{}{{",
                newlines_in(&captures[1]),
                &captures[2],
                &captures[3]
            )
        })
        .into_owned();
    for rewrite in rewrites() {
        rewritten = rewrite
            .pattern
            .replace_all(&rewritten, rewrite.replacement)
            .into_owned();
    }
    route_calls(&rewritten, functions)
}

fn newlines_in(text: &str) -> String {
    text.chars().filter(|ch| *ch == '\n').collect()
}

/// Turns `name(args)` into `call(name, args)` for the closures declared by
/// the program. Method calls such as `obj.name(` are left alone.
fn route_calls(code: &str, functions: &BTreeSet<String>) -> String {
    static CALL: OnceLock<Regex> = OnceLock::new();
    if functions.is_empty() {
        return code.to_string();
    }
    let call = CALL.get_or_init(|| {
        Regex::new(r"\b([A-Za-z_]\w*)(\s*)\(").expect("call regex should compile")
    });

    let mut out = String::with_capacity(code.len() + 8);
    let mut last = 0;
    for captures in call.captures_iter(code) {
        let (Some(whole), Some(name), Some(gap)) =
            (captures.get(0), captures.get(1), captures.get(2))
        else {
            continue;
        };
        let after_dot = code[..whole.start()].trim_end().ends_with('.');
        if after_dot || !functions.contains(name.as_str()) {
            continue;
        }
        out.push_str(&code[last..whole.start()]);
        out.push_str("call(");
        out.push_str(name.as_str());
        if !code[whole.end()..].trim_start().starts_with(')') {
            out.push_str(", ");
        }
        out.push_str(&newlines_in(gap.as_str()));
        last = whole.end();
    }
    out.push_str(&code[last..]);
    out
}

fn close_bodies(code: &str, braces: &mut Vec<bool>, out: &mut String) {
    for ch in code.chars() {
        match ch {
            CLOSURE_BODY => {
                braces.push(true);
                out.push('{');
            }
            '{' => {
                braces.push(false);
                out.push('{');
            }
            '}' => {
                out.push('}');
                if braces.pop() == Some(true) {
                    out.push(';');
                }
            }
            _ => out.push(ch),
        }
    }
}

#[cfg(test)]
mod dialect_tests {
    use super::*;

    #[test]
    fn rewrites_declarations_and_operators() {
        assert_eq!(rewrite_dialect("var x = 10;"), "let x = 10;");
        assert_eq!(
            rewrite_dialect("let ok = a === b && c !== d;"),
            "let ok = a == b && c != d;"
        );
        assert_eq!(rewrite_dialect("let v = null;"), "let v = ();");
        assert_eq!(rewrite_dialect("let v = undefined;"), "let v = ();");
    }

    #[test]
    fn leaves_identifiers_containing_keywords_alone() {
        assert_eq!(rewrite_dialect("let variable = 1;"), "let variable = 1;");
        assert_eq!(rewrite_dialect("let nullable = 1;"), "let nullable = 1;");
        assert_eq!(rewrite_dialect("let functional = 1;"), "let functional = 1;");
    }

    #[test]
    fn console_log_becomes_print() {
        assert_eq!(rewrite_dialect("console.log(x);"), "print(x);");
        assert_eq!(rewrite_dialect("console . log ('hi');"), "print(\"hi\");");
    }

    #[test]
    fn strings_and_comments_are_not_rewritten() {
        assert_eq!(
            rewrite_dialect("let s = \"var function null\";"),
            "let s = \"var function null\";"
        );
        assert_eq!(
            rewrite_dialect("let x = 1; // var y === null"),
            "let x = 1; // var y === null"
        );
        assert_eq!(
            rewrite_dialect("/* function */ var x = 1;"),
            "/* function */ let x = 1;"
        );
    }

    #[test]
    fn single_quoted_strings_become_double_quoted() {
        assert_eq!(rewrite_dialect("let s = 'abc';"), "let s = \"abc\";");
        assert_eq!(
            rewrite_dialect(r#"let s = 'say "hi"';"#),
            r#"let s = "say \"hi\"";"#
        );
        assert_eq!(rewrite_dialect(r"let s = 'it\'s';"), "let s = \"it's\";");
    }

    #[test]
    fn escaped_quotes_inside_double_quoted_strings_do_not_end_them() {
        assert_eq!(
            rewrite_dialect(r#"let s = "a \" var"; var y = 1;"#),
            r#"let s = "a \" var"; let y = 1;"#
        );
    }

    #[test]
    fn newlines_are_preserved() {
        let source = "var a = 1;\n// note\nvar b = 'x';\n/* a\nb */\nvar c = null;";
        let rewritten = rewrite_dialect(source);
        assert_eq!(source.lines().count(), rewritten.lines().count());
        assert!(rewritten.ends_with("let c = ();"));
    }

    #[test]
    fn named_functions_become_hoisted_closures() {
        assert_eq!(
            rewrite_dialect("function hop() { return 1; }"),
            "let hop = (); hop = || { return 1; };"
        );
        assert_eq!(
            rewrite_dialect("var speed = 2;\nfunction move(step) {\n  return speed + step;\n}\nvar x = move(1);"),
            "let move = (); let speed = 2;\nmove = |step| {\n  return speed + step;\n};\nlet x = call(move, 1);"
        );
    }

    #[test]
    fn closure_bodies_close_after_their_own_brace() {
        assert_eq!(
            rewrite_dialect("function a() { if (true) { return \"}\"; } }"),
            "let a = (); a = || { if (true) { return \"}\"; } };"
        );
    }

    #[test]
    fn calls_route_through_call_except_methods() {
        assert_eq!(
            rewrite_dialect("function twice(n) { return n * 2; }\nlet y = twice (twice(1)) + obj.twice(3);"),
            "let twice = (); twice = |n| { return n * 2; };\nlet y = call(twice, call(twice, 1)) + obj.twice(3);"
        );
        assert_eq!(
            rewrite_dialect("function hop() { return 1; }\nlet z = hop( );"),
            "let hop = (); hop = || { return 1; };\nlet z = call(hop );"
        );
    }

    #[test]
    fn anonymous_functions_become_closures() {
        assert_eq!(
            rewrite_dialect("var f = function (a) { return a; };"),
            "let f = |a| { return a; };"
        );
    }

    #[test]
    fn increments_and_compound_division_are_expanded() {
        assert_eq!(rewrite_dialect("x++;"), "x += 1;");
        assert_eq!(rewrite_dialect("++x;"), "x += 1;");
        assert_eq!(rewrite_dialect("count--;"), "count -= 1;");
        assert_eq!(rewrite_dialect("--count;"), "count -= 1;");
        assert_eq!(rewrite_dialect("scores[0]++;"), "scores[0] += 1;");
        assert_eq!(rewrite_dialect("total /= 2;"), "total = total / (2);");
        assert_eq!(rewrite_dialect("let s = \"x++\";"), "let s = \"x++\";");
    }
}
