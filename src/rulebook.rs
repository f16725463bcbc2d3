//! Static rulebook: symbolic rule types per check group, the canonical
//! severity vocabulary and the default-warning code set.
//!
//! Groups:
//! - `pep8-naming`: naming conventions (flake8 `N` class).
//! - one group per style sub-aspect (pycodestyle `E`/`W`, pyflakes `F`,
//!   mccabe `C`).
//! - `bandit`: security (flake8-bandit `S` class).
//!
//! Tables are ordered; blacklists derived from them keep this order.

use serde::{Deserialize, Serialize};
use std::fmt;

/// `(symbolic type, code)` pairs for one check group.
pub type RuleTable = &'static [(&'static str, &'static str)];

/// Code emitted by pycodestyle for over-long lines.
pub const LINE_TOO_LONG: &str = "E501";

/// Line length applied when `E501` is enabled without `max_line_length`.
pub const DEFAULT_MAX_LINE_LENGTH: u32 = 79;

pub const NAMING_GROUP: &str = "pep8-naming";
pub const SECURITY_GROUP: &str = "bandit";

const PEP8_NAMING: RuleTable = &[
    ("invalid_class_name", "N801"),
    ("invalid_function_name", "N802"),
    ("invalid_argument_name", "N803"),
    ("invalid_first_argument_name_for_class_method", "N804"),
    ("invalid_first_argument_name_for_method", "N805"),
    ("non_lowercase_variable_in_function", "N806"),
    ("dunder_function_name", "N807"),
    ("constant_imported_as_non_constant", "N811"),
    ("lowercase_imported_as_non_lowercase", "N812"),
    ("camelcase_imported_as_lowercase", "N813"),
    ("camelcase_imported_as_constant", "N814"),
    ("mixed_case_variable_in_class_scope", "N815"),
    ("mixed_case_variable_in_global_scope", "N816"),
    ("camelcase_imported_as_acronym", "N817"),
    ("error_suffix_in_exception_name", "N818"),
];

const INDENTATION: RuleTable = &[
    ("mixed_spaces_and_tabs", "E101"),
    ("indentation_not_multiple_of_four", "E111"),
    ("expected_indented_block", "E112"),
    ("unexpected_indentation", "E113"),
    ("comment_indentation_not_multiple_of_four", "E114"),
    ("comment_expected_indented_block", "E115"),
    ("comment_unexpected_indentation", "E116"),
    ("over_indented", "E117"),
    ("continuation_under_indented_hanging", "E121"),
    ("continuation_missing_indentation", "E122"),
    ("closing_bracket_mismatch_opening_line", "E123"),
    ("closing_bracket_mismatch_visual", "E124"),
    ("continuation_same_indent_as_next_line", "E125"),
    ("continuation_over_indented_hanging", "E126"),
    ("continuation_over_indented_visual", "E127"),
    ("continuation_under_indented_visual", "E128"),
    ("visual_indent_same_as_next_line", "E129"),
    ("continuation_unaligned_hanging", "E131"),
    ("closing_bracket_missing_indentation", "E133"),
    ("indentation_contains_tabs", "W191"),
];

const WHITESPACES: RuleTable = &[
    ("whitespace_after_open_bracket", "E201"),
    ("whitespace_before_close_bracket", "E202"),
    ("whitespace_before_punctuation", "E203"),
    ("whitespace_before_parameters", "E211"),
    ("multiple_spaces_before_operator", "E221"),
    ("multiple_spaces_after_operator", "E222"),
    ("tab_before_operator", "E223"),
    ("tab_after_operator", "E224"),
    ("missing_whitespace_around_operator", "E225"),
    ("missing_whitespace_around_arithmetic_operator", "E226"),
    ("missing_whitespace_around_bitwise_operator", "E227"),
    ("missing_whitespace_around_modulo_operator", "E228"),
    ("missing_whitespace_after_separator", "E231"),
    ("multiple_spaces_after_separator", "E241"),
    ("tab_after_separator", "E242"),
    ("unexpected_spaces_around_keyword_equals", "E251"),
    ("missing_whitespace_around_parameter_equals", "E252"),
    ("too_few_spaces_before_inline_comment", "E261"),
    ("inline_comment_format", "E262"),
    ("block_comment_format", "E265"),
    ("too_many_leading_hashes", "E266"),
    ("multiple_spaces_after_keyword", "E271"),
    ("multiple_spaces_before_keyword", "E272"),
    ("tab_after_keyword", "E273"),
    ("tab_before_keyword", "E274"),
    ("missing_whitespace_after_keyword", "E275"),
    ("trailing_whitespace", "W291"),
    ("whitespace_on_blank_line", "W293"),
];

const BLANK_LINES: RuleTable = &[
    ("expected_one_blank_line", "E301"),
    ("expected_two_blank_lines", "E302"),
    ("too_many_blank_lines", "E303"),
    ("blank_lines_after_decorator", "E304"),
    ("expected_two_blank_lines_after_definition", "E305"),
    ("expected_one_blank_line_before_nested_definition", "E306"),
    ("blank_line_at_end_of_file", "W391"),
];

const IMPORT: RuleTable = &[
    ("multiple_imports_on_one_line", "E401"),
    ("module_import_not_at_top", "E402"),
    ("unused_import", "F401"),
    ("star_import", "F403"),
    ("undefined_from_star_import", "F405"),
];

const LINE_LENGTH: RuleTable = &[("line_too_long", LINE_TOO_LONG)];

const STATEMENT: RuleTable = &[
    ("multiple_statements_colon", "E701"),
    ("multiple_statements_semicolon", "E702"),
    ("statement_ends_with_semicolon", "E703"),
    ("statement_on_same_line_as_def", "E704"),
    ("comparison_to_none", "E711"),
    ("comparison_to_bool", "E712"),
    ("not_in_test", "E713"),
    ("not_is_test", "E714"),
    ("type_comparison", "E721"),
    ("bare_except", "E722"),
    ("lambda_assignment", "E731"),
    ("ambiguous_variable_name", "E741"),
    ("ambiguous_class_name", "E742"),
    ("ambiguous_function_name", "E743"),
];

const RUNTIME: RuleTable = &[("syntax_error", "E901"), ("io_error", "E902")];

const LINE_BREAK: RuleTable = &[
    ("redundant_backslash", "E502"),
    ("no_newline_at_end_of_file", "W292"),
    ("line_break_before_binary_operator", "W503"),
    ("line_break_after_binary_operator", "W504"),
];

const DEPRECATION: RuleTable = &[
    ("has_key", "W601"),
    ("deprecated_raise", "W602"),
    ("not_equal_diamond", "W603"),
    ("backticks", "W604"),
    ("invalid_escape_sequence", "W605"),
    ("async_await_keywords", "W606"),
];

const FLOW_CONTROL: RuleTable = &[
    ("break_outside_loop", "F701"),
    ("continue_outside_loop", "F702"),
    ("yield_outside_function", "F704"),
    ("return_outside_function", "F706"),
    ("default_except_not_last", "F707"),
];

const LOGICAL_ISSUES: RuleTable = &[
    ("assert_on_tuple", "F631"),
    ("is_literal", "F632"),
    ("redefined_while_unused", "F811"),
    ("undefined_name", "F821"),
    ("undefined_export", "F822"),
    ("referenced_before_assignment", "F823"),
    ("unused_variable", "F841"),
];

const CODE_QUALITY: RuleTable = &[
    ("import_shadowed_by_loop_var", "F402"),
    ("late_future_import", "F404"),
    ("fstring_missing_placeholders", "F541"),
    ("repeated_dict_key", "F601"),
    ("raise_not_implemented", "F901"),
];

const LOGICAL_OPERATIONS: RuleTable = &[
    ("percent_format_invalid", "F501"),
    ("percent_format_expected_mapping", "F502"),
    ("percent_format_expected_sequence", "F503"),
    ("percent_format_unused_named_arguments", "F504"),
    ("percent_format_missing_argument", "F505"),
    ("percent_format_mixed_positional_and_named", "F506"),
    ("percent_format_positional_count_mismatch", "F507"),
    ("percent_format_star_requires_sequence", "F508"),
    ("percent_format_unsupported_format_character", "F509"),
    ("string_format_invalid", "F521"),
    ("string_format_unused_named_arguments", "F522"),
    ("string_format_unused_positional_arguments", "F523"),
    ("string_format_missing_argument", "F524"),
    ("string_format_mixed_automatic", "F525"),
    ("invalid_print_syntax", "F633"),
];

const CODE_COMPLEXITY: RuleTable = &[("complex_structure", "C901")];

const BANDIT: RuleTable = &[
    ("assert_used", "S101"),
    ("exec_used", "S102"),
    ("set_bad_file_permissions", "S103"),
    ("hardcoded_bind_all_interfaces", "S104"),
    ("hardcoded_password_string", "S105"),
    ("hardcoded_password_funcarg", "S106"),
    ("hardcoded_password_default", "S107"),
    ("hardcoded_tmp_directory", "S108"),
    ("try_except_pass", "S110"),
    ("try_except_continue", "S112"),
    ("request_without_timeout", "S113"),
    ("pickle_usage", "S301"),
    ("insecure_hash_function", "S303"),
    ("non_cryptographic_random", "S311"),
    ("insecure_hashlib_call", "S324"),
    ("request_with_no_cert_validation", "S501"),
    ("unsafe_yaml_load", "S506"),
    ("subprocess_popen_with_shell", "S602"),
    ("subprocess_without_shell", "S603"),
    ("start_process_with_a_shell", "S605"),
    ("start_process_with_partial_path", "S607"),
    ("hardcoded_sql_expressions", "S608"),
    ("jinja2_autoescape_false", "S701"),
];

/// Codes classified as `warning` when the policy sets no override.
const WARNING_CODES: &[&str] = &[
    "W191", "W291", "W292", "W293", "W391", "W503", "W504", "W601", "W602", "W603", "W604",
    "W605", "W606", "E501", "C901", "N815", "N816", "S101", "S311",
];

/// Return the table for a check group (`pep8-naming`, `bandit` or a style
/// sub-aspect key).
pub fn table(group: &str) -> Option<RuleTable> {
    let t = match group {
        NAMING_GROUP => PEP8_NAMING,
        SECURITY_GROUP => BANDIT,
        "indentation" => INDENTATION,
        "whitespaces" => WHITESPACES,
        "blank_lines" => BLANK_LINES,
        "import" => IMPORT,
        "line_length" => LINE_LENGTH,
        "statement" => STATEMENT,
        "runtime" => RUNTIME,
        "line_break" => LINE_BREAK,
        "deprecation" => DEPRECATION,
        "flow_control" => FLOW_CONTROL,
        "logical_issues" => LOGICAL_ISSUES,
        "code_quality" => CODE_QUALITY,
        "logical_operations" => LOGICAL_OPERATIONS,
        "code_complexity" => CODE_COMPLEXITY,
        _ => return None,
    };
    Some(t)
}

/// Resolve a symbolic rule type to its code within `table`.
pub fn lookup(table: RuleTable, type_name: &str) -> Option<&'static str> {
    table
        .iter()
        .find(|(t, _)| *t == type_name)
        .map(|(_, code)| *code)
}

pub fn is_warning(code: &str) -> bool {
    WARNING_CODES.contains(&code)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Closed severity vocabulary. Declaration order is the canonical order.
pub enum Severity {
    Error,
    Warning,
    Info,
    Hint,
}

impl Severity {
    pub const ORDERED: [Severity; 4] = [
        Severity::Error,
        Severity::Warning,
        Severity::Info,
        Severity::Hint,
    ];

    /// Parse a policy-supplied severity; `None` for anything outside the
    /// vocabulary.
    pub fn parse(s: &str) -> Option<Severity> {
        match s.trim() {
            "error" => Some(Severity::Error),
            "warning" => Some(Severity::Warning),
            "info" => Some(Severity::Info),
            "hint" => Some(Severity::Hint),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
            Severity::Hint => "hint",
        }
    }

    /// Numeric rank, 1 being the most severe.
    pub fn rank(self) -> u8 {
        match self {
            Severity::Error => 1,
            Severity::Warning => 2,
            Severity::Info => 3,
            Severity::Hint => 4,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
