//! Option template expansion.
//!
//! A token that exactly names an entry of `option_templates` is replaced in
//! place by the template's lines, one option per line. Expansion is a single
//! level: template bodies are never scanned for further template names.
//! Any other token is a literal option and passes through unchanged.

use vidgen_project_model::TextMap;

/// Expand template references in `tokens`.
pub fn expand_templates(tokens: &[String], templates: &TextMap) -> Vec<String> {
    let mut expanded = Vec::with_capacity(tokens.len());
    for token in tokens {
        match templates.get(token) {
            Some(body) => expanded.extend(body.lines().map(str::to_string)),
            None => expanded.push(token.clone()),
        }
    }
    expanded
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_template_lines_inserted_in_place() {
        let templates: TextMap = [("shared_options", "-c:v h264\n-r $fps")].into_iter().collect();
        let tokens = strings(&["-f lavfi", "shared_options", "-t 5"]);

        assert_eq!(
            expand_templates(&tokens, &templates),
            strings(&["-f lavfi", "-c:v h264", "-r $fps", "-t 5"])
        );
    }

    #[test]
    fn test_literals_pass_through() {
        let tokens = strings(&["-y", "-loop 1"]);
        assert_eq!(expand_templates(&tokens, &TextMap::new()), tokens);
    }

    #[test]
    fn test_expansion_is_single_level() {
        let templates: TextMap = [("outer", "inner\n-y"), ("inner", "-never")]
            .into_iter()
            .collect();
        let tokens = strings(&["outer"]);

        assert_eq!(expand_templates(&tokens, &templates), strings(&["inner", "-y"]));
    }

    #[test]
    fn test_partial_name_is_literal() {
        let templates: TextMap = [("encode", "-c:v h264")].into_iter().collect();
        let tokens = strings(&["encode_fast", "-encode"]);
        assert_eq!(expand_templates(&tokens, &templates), tokens);
    }

    #[test]
    fn test_repeated_reference_expands_each_time() {
        let templates: TextMap = [("p", "-a\n-b")].into_iter().collect();
        let tokens = strings(&["p", "-x", "p"]);
        assert_eq!(
            expand_templates(&tokens, &templates),
            strings(&["-a", "-b", "-x", "-a", "-b"])
        );
    }
}
