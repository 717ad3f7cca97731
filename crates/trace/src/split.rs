//! Quote-aware field splitting

/// Split syscall arguments on top-level commas
///
/// Commas inside `[...]` or inside a double-quoted string are not split
/// points. Quotes are a plain toggle; the tracer never escapes them. A
/// trailing `...` (truncated argument list) is dropped first.
pub fn split_args(args: &str) -> Vec<&str> {
    let args = match args.strip_suffix("...") {
        Some(rest) => rest.trim(),
        None => args,
    };

    let mut fields = Vec::new();
    let mut start = 0;
    let mut depth = 0i32;
    let mut in_quote = false;

    for (i, c) in args.char_indices() {
        match c {
            ',' if !in_quote && depth == 0 => {
                fields.push(args[start..i].trim());
                start = i + 1;
            }
            '"' => in_quote = !in_quote,
            '[' if !in_quote => depth += 1,
            ']' if !in_quote => depth -= 1,
            _ => {}
        }
    }
    if start < args.len() {
        fields.push(args[start..].trim());
    }
    fields
}

/// Split one CSV record
///
/// Quoted fields may contain commas; `""` inside quotes is a literal quote.
pub fn split_csv(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quote = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quote => {
                if chars.peek() == Some(&'"') {
                    field.push('"');
                    chars.next();
                } else {
                    in_quote = false;
                }
            }
            '"' if field.is_empty() => in_quote = true,
            ',' if !in_quote => fields.push(std::mem::take(&mut field)),
            c => field.push(c),
        }
    }
    fields.push(field);
    fields
}
