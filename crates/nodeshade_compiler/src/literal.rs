// SPDX-License-Identifier: MIT OR Apache-2.0
//! Literal formatting shared by the code generator, reconstructor, and
//! evaluator: numbers, hex colors, and identifier sanitizing.

/// Format a number the way the generator emits it: no trailing zeros,
/// integers without a decimal point.
pub fn format_number(n: f64) -> String {
    if n == n.trunc() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        let mut s = format!("{n}");
        if s.contains('.') {
            while s.ends_with('0') {
                s.pop();
            }
            if s.ends_with('.') {
                s.pop();
            }
        }
        s
    }
}

/// Convert a `"#rrggbb"` color to the `0xrrggbb` literal form
pub fn css_to_hex(css: &str) -> Option<String> {
    let digits = css.strip_prefix('#')?;
    if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    Some(format!("0x{}", digits.to_ascii_lowercase()))
}

/// Convert a `0xrrggbb` literal to the `"#rrggbb"` stored color form
pub fn hex_to_css(lexeme: &str) -> Option<String> {
    let digits = lexeme.strip_prefix("0x").or_else(|| lexeme.strip_prefix("0X"))?;
    if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    Some(format!("#{}", digits.to_ascii_lowercase()))
}

/// Decode a `"#rrggbb"` color into normalized RGB channels
pub fn css_to_rgb(css: &str) -> Option<[f32; 3]> {
    let digits = css.strip_prefix('#')?;
    if digits.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
    Some([
        f32::from(channel(0)?) / 255.0,
        f32::from(channel(2)?) / 255.0,
        f32::from(channel(4)?) / 255.0,
    ])
}

/// Turn an arbitrary label into a safe program identifier
pub fn sanitize_ident(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    for c in label.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            out.push(c);
        } else if c.is_whitespace() || c == '-' {
            out.push('_');
        }
    }
    if out.is_empty() || out.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// Channel index for a single-character accessor (`x`/`r` = 0, ...)
pub fn channel_index(name: &str) -> Option<usize> {
    match name {
        "x" | "r" => Some(0),
        "y" | "g" => Some(1),
        "z" | "b" => Some(2),
        "w" | "a" => Some(3),
        _ => None,
    }
}
