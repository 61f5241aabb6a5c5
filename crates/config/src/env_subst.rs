/// Expand `${VAR}` and `${VAR:-fallback}` placeholders from the environment.
///
/// A placeholder whose variable is unset and has no fallback is kept
/// verbatim, as is an unterminated `${`.
pub fn substitute_env(input: &str) -> String {
    substitute_with(input, |name| std::env::var(name).ok())
}

fn substitute_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };

        let body = &after[..end];
        let (name, fallback) = match body.split_once(":-") {
            Some((name, fallback)) => (name, Some(fallback)),
            None => (body, None),
        };

        match (name.is_empty(), lookup(name), fallback) {
            (false, Some(value), _) => out.push_str(&value),
            (false, None, Some(fallback)) => out.push_str(fallback),
            _ => {
                out.push_str("${");
                out.push_str(body);
                out.push('}');
            },
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(name: &str) -> Option<String> {
        (name == "PARLEY_STRATEGY").then(|| "global".to_string())
    }

    #[test]
    fn substitutes_known_var() {
        assert_eq!(
            substitute_with("strategy = \"${PARLEY_STRATEGY}\"", lookup),
            "strategy = \"global\""
        );
    }

    #[test]
    fn uses_fallback_for_unset_var() {
        assert_eq!(
            substitute_with("${PARLEY_MISSING:-session}", lookup),
            "session"
        );
        assert_eq!(
            substitute_with("${PARLEY_STRATEGY:-session}", lookup),
            "global"
        );
    }

    #[test]
    fn leaves_unknown_and_malformed_placeholders() {
        assert_eq!(substitute_with("${PARLEY_MISSING}", lookup), "${PARLEY_MISSING}");
        assert_eq!(substitute_with("a ${open", lookup), "a ${open");
        assert_eq!(substitute_with("${}", lookup), "${}");
    }

    #[test]
    fn reads_process_environment() {
        assert_eq!(substitute_env("plain text"), "plain text");
    }
}
