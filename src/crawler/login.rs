//! Login-form detection
//!
//! A form is a login form when somewhere beneath it there is a password
//! input and a text/email input whose name or id mentions a user identifier.

use scraper::ElementRef;

const USERNAME_HINTS: [&str; 3] = ["user", "email", "login"];

/// Returns true if `form` looks like a login form
///
/// All descendants are scanned, not only direct children, so inputs nested
/// in fieldsets, tables or divs count.
pub fn is_login_form(form: ElementRef<'_>) -> bool {
    let mut has_password = false;
    let mut has_username = false;

    for node in form.descendants() {
        let Some(input) = ElementRef::wrap(node) else {
            continue;
        };
        if input.value().name() != "input" {
            continue;
        }

        if is_password_input(input) {
            has_password = true;
        }
        if is_username_input(input) {
            has_username = true;
        }

        if has_password && has_username {
            return true;
        }
    }

    false
}

/// Returns true for `<input type="password">`
///
/// The type value is matched exactly.
pub fn is_password_input(input: ElementRef<'_>) -> bool {
    input.value().attr("type") == Some("password")
}

fn is_username_input(input: ElementRef<'_>) -> bool {
    let input_type = input.value().attr("type").unwrap_or("");
    if input_type != "text" && input_type != "email" {
        return false;
    }

    ["name", "id"].iter().any(|attr| {
        input
            .value()
            .attr(attr)
            .map(|value| {
                let value = value.to_lowercase();
                USERNAME_HINTS.iter().any(|hint| value.contains(hint))
            })
            .unwrap_or(false)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    fn first_form_is_login(html: &str) -> bool {
        let document = Html::parse_document(html);
        let selector = Selector::parse("form").unwrap();
        let form = document.select(&selector).next().expect("no form in fixture");
        is_login_form(form)
    }

    #[test]
    fn test_password_and_username() {
        assert!(first_form_is_login(
            r#"<form><input type="text" name="username"><input type="password"></form>"#
        ));
    }

    #[test]
    fn test_password_only() {
        assert!(!first_form_is_login(
            r#"<form><input type="password" name="pw"></form>"#
        ));
    }

    #[test]
    fn test_username_only() {
        assert!(!first_form_is_login(
            r#"<form><input type="email" name="email"></form>"#
        ));
    }

    #[test]
    fn test_id_matches_case_insensitively() {
        assert!(first_form_is_login(
            r#"<form><input type="email" id="Login-Email"><input type="password"></form>"#
        ));
    }

    #[test]
    fn test_nested_inputs_are_found() {
        assert!(first_form_is_login(
            r#"<form><fieldset><div><input type="text" name="user_name"></div></fieldset>
               <div><span><input type="password"></span></div></form>"#
        ));
    }

    #[test]
    fn test_unrelated_text_field() {
        assert!(!first_form_is_login(
            r#"<form><input type="text" name="search"><input type="password"></form>"#
        ));
    }

    #[test]
    fn test_untyped_input_is_not_username() {
        // no type attribute: the heuristic only looks at explicit text/email inputs
        assert!(!first_form_is_login(
            r#"<form><input name="username"><input type="password"></form>"#
        ));
    }
}
