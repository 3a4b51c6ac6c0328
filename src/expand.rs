//! `$name` and `$(name)` expansion.

use crate::env::VariableTable;
use crate::words::WordList;

/// Replace variable references with their values from `vars`.
///
/// A word containing `$(` and a later `)` names the variable between them;
/// otherwise a word containing `$` names everything after it. The whole
/// word becomes the variable's value, or the empty string when the
/// variable is not defined. Nothing is expanded while the table is empty.
pub fn expand_variables(words: WordList, vars: &VariableTable) -> WordList {
    if vars.is_empty() {
        return words;
    }

    words
        .into_iter()
        .map(|word| match reference_name(&word) {
            Some(name) => {
                let value = vars.get(name).unwrap_or_default().to_owned();
                tracing::trace!(%word, %value, "variable expansion");
                value
            }
            None => word,
        })
        .collect()
}

/// Variable named by `word`, if it holds a non-empty reference.
fn reference_name(word: &str) -> Option<&str> {
    let name = match parenthesized(word) {
        Some(name) => name,
        None => &word[word.find('$')? + 1..],
    };
    (!name.is_empty()).then_some(name)
}

fn parenthesized(word: &str) -> Option<&str> {
    let start = word.find("$(")? + 2;
    let len = word[start..].find(')')?;
    Some(&word[start..start + len])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(pairs: &[(&str, &str)]) -> VariableTable {
        let mut vars = VariableTable::new();
        for (name, value) in pairs {
            vars.set(*name, *value);
        }
        vars
    }

    fn expand(line: &str, vars: &VariableTable) -> Vec<String> {
        expand_variables(WordList::parse(line), vars).into_vec()
    }

    #[test]
    fn test_dollar_reference() {
        let vars = table(&[("X", "5")]);
        assert_eq!(expand("echo $X", &vars), vec!["echo", "5"]);
    }

    #[test]
    fn test_undefined_is_empty_word() {
        let vars = table(&[("X", "5")]);
        assert_eq!(expand("echo $Y end", &vars), vec!["echo", "", "end"]);
    }

    #[test]
    fn test_parenthesized_reference() {
        let vars = table(&[("HOME_DIR", "/home/u")]);
        assert_eq!(expand("cd $(HOME_DIR)", &vars), vec!["cd", "/home/u"]);
    }

    #[test]
    fn test_whole_word_is_replaced() {
        let vars = table(&[("X", "5")]);
        assert_eq!(expand("prefix$X", &vars), vec!["5"]);
        assert_eq!(expand("a$(X)b", &vars), vec!["5"]);
    }

    #[test]
    fn test_no_nested_expansion() {
        let vars = table(&[("A", "$B"), ("B", "deep")]);
        assert_eq!(expand("$A", &vars), vec!["$B"]);
    }

    #[test]
    fn test_empty_name_is_left_alone() {
        let vars = table(&[("X", "5")]);
        assert_eq!(expand("$ $()", &vars), vec!["$", "$()"]);
    }

    #[test]
    fn test_empty_table_expands_nothing() {
        let vars = VariableTable::new();
        assert_eq!(expand("echo $X", &vars), vec!["echo", "$X"]);
    }
}
