//! Shell-style splitting of expanded recipe patterns.

/// Split a command line into arguments.
///
/// Whitespace separates arguments except inside single or double quotes;
/// the quotes themselves are removed. An unterminated quote runs to the end
/// of the input.
pub fn split_args(input: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut in_arg = false;

    for c in input.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None => match c {
                '"' | '\'' => {
                    quote = Some(c);
                    in_arg = true;
                }
                c if c.is_whitespace() => {
                    if in_arg {
                        args.push(std::mem::take(&mut current));
                        in_arg = false;
                    }
                }
                c => {
                    current.push(c);
                    in_arg = true;
                }
            },
        }
    }

    if in_arg {
        args.push(current);
    }

    args
}
