//! Selector vocabulary shared by every layer that reads the page.

/// Prefix of selectors synthesized from an element's index; never re-resolved.
pub const POSITIONAL_PREFIX: &str = "position:";

/// Modal and dialog containers.
pub const OVERLAY: &str = "[role=\"dialog\"], [role=\"alertdialog\"], [aria-modal=\"true\"], \
[class*=\"modal\"], [class*=\"Modal\"], [class*=\"dialog\"], [class*=\"Dialog\"], \
[data-testid*=\"modal\"], [data-testid*=\"Modal\"]";

/// Open dropdown menus and listboxes.
pub const DROPDOWN_MENU: &str = "[role=\"listbox\"], [role=\"menu\"], \
[class*=\"dropdown-menu\"], [class*=\"DropdownMenu\"], [class*=\"menu-open\"], \
[data-testid*=\"dropdown-menu\"], [data-testid*=\"DropdownMenu\"]";

/// Selectable entries inside menus and overlays.
pub const OPTION: &str = "[role=\"option\"], [role=\"menuitem\"], [role=\"menuitemradio\"], \
li, option, [class*=\"option\"], [class*=\"Option\"], [data-testid*=\"option\"], \
[data-testid*=\"Option\"]";

/// Controls a human would click by their label.
pub const INTERACTIVE: &str = "button, a, li, label, [role=\"button\"], [role=\"link\"], \
[role=\"option\"], [role=\"menuitem\"], [role=\"tab\"], [role=\"radio\"], \
input[type=\"submit\"], input[type=\"button\"]";

/// Buttons, for scanning inside overlays.
pub const BUTTON: &str = "button, [role=\"button\"], input[type=\"submit\"], \
input[type=\"button\"], a[class*=\"btn\"], a[class*=\"button\"]";

/// Native and custom dropdown controls.
pub const DROPDOWN_CONTROL: &str = "select, [role=\"combobox\"], [aria-haspopup=\"listbox\"], \
[aria-haspopup=\"menu\"], [data-testid*=\"dropdown\"], [data-testid*=\"Dropdown\"], \
[class*=\"dropdown-toggle\"], [class*=\"DropdownToggle\"], [class*=\"select__control\"]";

/// Inline validation messages.
pub const ERROR_MESSAGE: &str = "[role=\"alert\"], [aria-live=\"assertive\"], \
[class*=\"error-message\"], [class*=\"ErrorMessage\"], [class*=\"form-error\"], \
[class*=\"field-error\"], [class*=\"invalid-feedback\"], [class*=\"error\"], \
[data-testid*=\"error\"], [data-testid*=\"Error\"]";

/// `true` for selectors the snapshot builder produced from an index.
pub fn is_positional(selector: &str) -> bool {
    selector.trim_start().starts_with(POSITIONAL_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positional_detection() {
        assert!(is_positional("position:button:3"));
        assert!(is_positional("  position:input:0"));
        assert!(!is_positional("#position"));
        assert!(!is_positional("button[data-position=\"1\"]"));
    }
}
