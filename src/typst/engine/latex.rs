//! Translate the LaTeX-ish tutorial notation into Typst math markup.
//!
//! Tutorials write sources like `\frac{4}{5}x - 9 = -1` or `\text{Step 1: ...}`
//! because that is what the headless typesetter and every pattern in the crate use.
//! Typst math differs in a few ways that matter here:
//! - adjacent letters form an identifier (`xy` is a variable lookup), so every letter
//!   is emitted as its own token;
//! - `/` builds a fraction and `,` separates function arguments, so both are escaped;
//! - braces are not grouping, so `{..}` is inlined and script arguments use `(..)`.

use std::iter::Peekable;
use std::str::CharIndices;

use anyhow::{Context, bail};

/// Translate `source` into the body of a Typst `$..$` math block.
pub fn latex_to_typst(source: &str) -> anyhow::Result<String> {
    let mut parser = Parser {
        src: source,
        chars: source.char_indices().peekable(),
    };
    let tokens = parser
        .list(None)
        .with_context(|| format!("translating {source:?} to Typst math"))?;
    Ok(tokens.join(" "))
}

struct Parser<'a> {
    src: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl Parser<'_> {
    /// Tokens up to `close` (or end of input when `None`).
    fn list(&mut self, close: Option<char>) -> anyhow::Result<Vec<String>> {
        let mut out = Vec::new();
        while let Some(&(_, c)) = self.chars.peek() {
            if Some(c) == close {
                self.chars.next();
                return Ok(out);
            }
            self.chars.next();
            match c {
                c if c.is_whitespace() => {}
                '{' => out.extend(self.list(Some('}'))?),
                '}' => bail!("unbalanced '}}'"),
                '\\' => {
                    if let Some(token) = self.command()? {
                        out.push(token);
                    }
                }
                '^' | '_' => {
                    let arg = self.argument()?;
                    // Attach to the previous token so Typst sees `base^(..)`.
                    let script = format!("{c}({arg})");
                    match out.last_mut() {
                        Some(base) => base.push_str(&script),
                        None => out.push(format!("\"\"{script}")),
                    }
                }
                '0'..='9' => out.push(self.number(c)),
                c if c.is_alphabetic() => out.push(c.to_string()),
                '+' | '-' | '−' | '=' | '(' | ')' => out.push(c.to_string()),
                c => out.push(format!("\\{c}")),
            }
        }
        match close {
            Some(c) => bail!("missing '{c}'"),
            None => Ok(out),
        }
    }

    /// Argument of `^`, `_` or `\frac`: a braced group or a single token.
    fn argument(&mut self) -> anyhow::Result<String> {
        while self.chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}
        match self.chars.peek() {
            Some(&(_, '{')) => {
                self.chars.next();
                Ok(self.list(Some('}'))?.join(" "))
            }
            Some(&(_, '\\')) => {
                self.chars.next();
                Ok(self.command()?.unwrap_or_default())
            }
            Some(&(_, c)) => {
                self.chars.next();
                Ok(match c {
                    '0'..='9' => c.to_string(),
                    c if c.is_alphanumeric() => c.to_string(),
                    c => format!("\\{c}"),
                })
            }
            None => bail!("missing argument"),
        }
    }

    fn number(&mut self, first: char) -> String {
        let mut text = first.to_string();
        while let Some((_, c)) = self.chars.next_if(|(_, c)| c.is_ascii_digit() || *c == '.') {
            text.push(c);
        }
        if text.ends_with('.') {
            text.pop();
            text.push_str(" \\.");
        }
        text
    }

    fn command(&mut self) -> anyhow::Result<Option<String>> {
        let Some(&(start, first)) = self.chars.peek() else {
            bail!("dangling '\\'");
        };
        if !first.is_ascii_alphabetic() {
            self.chars.next();
            return Ok(match first {
                ',' | ' ' => Some("thin".to_string()),
                ':' | ';' => Some("med".to_string()),
                '!' => None,
                c => Some(format!("\\{c}")),
            });
        }
        let mut end = start;
        while let Some((i, c)) = self.chars.next_if(|(_, c)| c.is_ascii_alphabetic()) {
            end = i + c.len_utf8();
        }
        let name = &self.src[start..end];
        Ok(match name {
            "frac" | "dfrac" | "tfrac" => {
                let num = self.argument()?;
                let den = self.argument()?;
                Some(format!("frac({num}, {den})"))
            }
            "text" | "mathrm" => Some(self.text()?),
            "cdot" => Some("dot.op".to_string()),
            "times" => Some("times".to_string()),
            "div" => Some("div".to_string()),
            "pm" => Some("plus.minus".to_string()),
            "to" | "rightarrow" => Some("arrow.r".to_string()),
            "quad" => Some("quad".to_string()),
            "qquad" => Some("wide".to_string()),
            "left" | "right" => None,
            other => bail!("unsupported command \\{other}"),
        })
    }

    /// `\text{..}` body as a Typst string literal.
    fn text(&mut self) -> anyhow::Result<String> {
        while self.chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}
        if self.chars.next_if(|(_, c)| *c == '{').is_none() {
            bail!("\\text needs a braced argument");
        }
        let mut out = String::from("\"");
        let mut depth = 0usize;
        loop {
            let Some((_, c)) = self.chars.next() else {
                bail!("missing '}}' after \\text");
            };
            match c {
                '{' => depth += 1,
                '}' if depth == 0 => break,
                '}' => depth -= 1,
                '"' | '\\' => {
                    out.push('\\');
                    out.push(c);
                }
                c => out.push(c),
            }
        }
        out.push('"');
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_are_separate_tokens() {
        assert_eq!(latex_to_typst("4n - 26 = -2").unwrap(), "4 n - 26 = - 2");
        assert_eq!(latex_to_typst("xy").unwrap(), "x y");
    }

    #[test]
    fn fractions_and_scripts() {
        assert_eq!(
            latex_to_typst(r"\frac{4}{5}x - 9 = -1").unwrap(),
            "frac(4, 5) x - 9 = - 1"
        );
        assert_eq!(latex_to_typst("x^{2} + a_1").unwrap(), "x^(2) + a_(1)");
        assert_eq!(latex_to_typst(r"\cdot \frac{5}{4}").unwrap(), "dot.op frac(5, 4)");
    }

    #[test]
    fn text_becomes_a_string() {
        assert_eq!(
            latex_to_typst(r#"\text{Step 1: say "hi"}"#).unwrap(),
            r#""Step 1: say \"hi\"""#
        );
    }

    #[test]
    fn punctuation_is_escaped() {
        assert_eq!(latex_to_typst("1.5, 2/3").unwrap(), r"1.5 \, 2 \/ 3");
        assert_eq!(latex_to_typst(r"+26 \qquad +26").unwrap(), "+ 26 wide + 26");
    }

    #[test]
    fn malformed_input_is_an_error() {
        assert!(latex_to_typst(r"\frac{1}{2").is_err());
        assert!(latex_to_typst("x}").is_err());
        assert!(latex_to_typst(r"\unknown").is_err());
    }
}
