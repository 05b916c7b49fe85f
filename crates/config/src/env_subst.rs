/// Replace `${ENV_VAR}` placeholders in raw config text.
///
/// Unresolvable variables are left as-is.
pub fn substitute_env(input: &str) -> String {
    substitute_env_with(input, |name| std::env::var(name).ok())
}

/// Replace `${ENV_VAR}` placeholders using a custom lookup function.
fn substitute_env_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        let Some(end) = after.find('}') else {
            // Unterminated: emit the remainder verbatim.
            result.push_str(&rest[start..]);
            return result;
        };

        let name = &after[..end];
        match (!name.is_empty()).then(|| lookup(name)).flatten() {
            Some(value) => result.push_str(&value),
            None => result.push_str(&rest[start..start + 2 + end + 1]),
        }
        rest = &after[end + 1..];
    }

    result.push_str(rest);
    result
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    fn lookup(name: &str) -> Option<String> {
        match name {
            "SYNAPSE_TOKEN" => Some("abc".to_string()),
            "SYNAPSE_CHANNEL" => Some("42".to_string()),
            _ => None,
        }
    }

    #[rstest]
    #[case("token = \"${SYNAPSE_TOKEN}\"", "token = \"abc\"")]
    #[case("${SYNAPSE_TOKEN}/${SYNAPSE_CHANNEL}", "abc/42")]
    #[case("${SYNAPSE_MISSING}", "${SYNAPSE_MISSING}")]
    #[case("${}", "${}")]
    #[case("prefix ${SYNAPSE_TOKEN", "prefix ${SYNAPSE_TOKEN")]
    #[case("plain text", "plain text")]
    fn substitutes(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(substitute_env_with(input, lookup), expected);
    }
}
