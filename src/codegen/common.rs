//! Name mangling shared by every backend: case conversion, reserved-word
//! escaping, and string literal quoting.

/// `DoThing` → `doThing`.
pub fn lower_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `doThing` → `DoThing`.
pub fn upper_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `do_thing` / `doThing` → `DoThing`.
pub fn upper_camel(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.is_empty())
        .map(upper_first)
        .collect()
}

/// `DoThing` → `do_thing`, `HTTPServer` → `http_server`, `kMax` → `k_max`.
pub fn snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &ch) in chars.iter().enumerate() {
        if ch.is_ascii_uppercase() {
            let prev = if i > 0 { Some(chars[i - 1]) } else { None };
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                None | Some('_') => false,
                Some(p) if p.is_ascii_lowercase() || p.is_ascii_digit() => true,
                // end of an acronym: "PServer" in "HTTPServer"
                Some(p) if p.is_ascii_uppercase() => next.map_or(false, |n| n.is_ascii_lowercase()),
                Some(_) => false,
            };
            if boundary {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// `maxSize` → `MAX_SIZE`.
pub fn constant_case(name: &str) -> String {
    snake_case(name).to_ascii_uppercase()
}

/// Append `_` to a name the target language reserves.
pub fn escape_reserved(name: &str, is_reserved: fn(&str) -> bool) -> String {
    if is_reserved(name) {
        format!("{name}_")
    } else {
        name.to_string()
    }
}

/// Double-quoted literal with C-style escapes; other control characters
/// become `\uXXXX`, which every target language accepts inside strings.
pub fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for ch in text.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 || c == '\u{7f}' => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Directory part of a module name, with a trailing `/` when non-empty.
pub fn module_dir(module_name: &str) -> String {
    match module_name.rfind('/') {
        Some(pos) => module_name[..=pos].to_string(),
        None => String::new(),
    }
}

/// File name of a module without its directory and `.mojom` extension.
pub fn module_stem(module_name: &str) -> &str {
    let file = module_name.rsplit('/').next().unwrap_or(module_name);
    file.strip_suffix(".mojom").unwrap_or(file)
}

// ===== Reserved words =====

pub fn is_cpp_reserved(name: &str) -> bool {
    matches!(
        name,
        "alignas" | "alignof" | "and" | "asm" | "auto" | "bool" | "break" | "case"
            | "catch" | "char" | "class" | "const" | "constexpr" | "continue" | "decltype"
            | "default" | "delete" | "do" | "double" | "else" | "enum" | "explicit"
            | "export" | "extern" | "false" | "float" | "for" | "friend" | "goto" | "if"
            | "inline" | "int" | "long" | "mutable" | "namespace" | "new" | "noexcept"
            | "not" | "nullptr" | "operator" | "or" | "private" | "protected" | "public"
            | "register" | "return" | "short" | "signed" | "sizeof" | "static"
            | "struct" | "switch" | "template" | "this" | "throw" | "true" | "try"
            | "typedef" | "typeid" | "typename" | "union" | "unsigned" | "using"
            | "virtual" | "void" | "volatile" | "while" | "xor"
    )
}

pub fn is_js_reserved(name: &str) -> bool {
    matches!(
        name,
        // ES2015+ keywords
        "break" | "case" | "catch" | "class" | "const" | "continue" | "debugger"
            | "default" | "delete" | "do" | "else" | "export" | "extends" | "finally"
            | "for" | "function" | "if" | "import" | "in" | "instanceof" | "new"
            | "return" | "super" | "switch" | "this" | "throw" | "try" | "typeof"
            | "var" | "void" | "while" | "with"
            // Sometimes reserved
            | "await" | "let" | "static" | "yield"
            // Future reserved
            | "enum" | "implements" | "interface" | "package" | "private"
            | "protected" | "public"
            // Literals
            | "null" | "true" | "false"
            // Globals the generated code relies on
            | "undefined" | "NaN" | "Infinity"
    )
}

pub fn is_python_reserved(name: &str) -> bool {
    matches!(
        name,
        "False" | "None" | "True" | "and" | "as" | "assert" | "async" | "await"
            | "break" | "class" | "continue" | "def" | "del" | "elif" | "else"
            | "except" | "finally" | "for" | "from" | "global" | "if" | "import"
            | "in" | "is" | "lambda" | "nonlocal" | "not" | "or" | "pass" | "raise"
            | "return" | "try" | "while" | "with" | "yield"
    )
}

pub fn is_java_reserved(name: &str) -> bool {
    matches!(
        name,
        "abstract" | "assert" | "boolean" | "break" | "byte" | "case" | "catch"
            | "char" | "class" | "const" | "continue" | "default" | "do" | "double"
            | "else" | "enum" | "extends" | "final" | "finally" | "float" | "for"
            | "goto" | "if" | "implements" | "import" | "instanceof" | "int"
            | "interface" | "long" | "native" | "new" | "package" | "private"
            | "protected" | "public" | "return" | "short" | "static" | "strictfp"
            | "super" | "switch" | "synchronized" | "this" | "throw" | "throws"
            | "transient" | "try" | "void" | "volatile" | "while" | "true" | "false"
            | "null"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_conversion() {
        assert_eq!(lower_first("DoThing"), "doThing");
        assert_eq!(lower_first(""), "");
        assert_eq!(upper_camel("do_thing"), "DoThing");
        assert_eq!(upper_camel("doThing"), "DoThing");
        assert_eq!(snake_case("DoThing"), "do_thing");
        assert_eq!(snake_case("HTTPServer"), "http_server");
        assert_eq!(snake_case("kMaxSize"), "k_max_size");
        assert_eq!(snake_case("already_snake"), "already_snake");
        assert_eq!(snake_case("Point3D"), "point3_d");
        assert_eq!(constant_case("maxSize"), "MAX_SIZE");
    }

    #[test]
    fn test_escape_reserved() {
        assert_eq!(escape_reserved("class", is_cpp_reserved), "class_");
        assert_eq!(escape_reserved("delete", is_js_reserved), "delete_");
        assert_eq!(escape_reserved("from", is_python_reserved), "from_");
        assert_eq!(escape_reserved("native", is_java_reserved), "native_");
        assert_eq!(escape_reserved("point", is_java_reserved), "point");
    }

    #[test]
    fn test_quote() {
        assert_eq!(quote("plain"), "\"plain\"");
        assert_eq!(quote("a\"b\\c\n"), "\"a\\\"b\\\\c\\n\"");
        assert_eq!(quote("\u{1}"), "\"\\u0001\"");
    }

    #[test]
    fn test_module_paths() {
        assert_eq!(module_dir("sub/dir/base.mojom"), "sub/dir/");
        assert_eq!(module_dir("base.mojom"), "");
        assert_eq!(module_stem("sub/dir/base.mojom"), "base");
        assert_eq!(module_stem("odd"), "odd");
    }
}
