//! Locator registry for the storefront's DOM surface
//!
//! Every element the scenarios and command helpers touch is named here.
//! Locators are plain data; scenarios refer to them by dotted name
//! (`login.email`) and the parameterized ones take arguments
//! (`products.category_link(Women, 1)`).

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{E2eError, E2eResult};

/// Selection engine for a locator expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Css,
    XPath,
    /// Case-insensitive substring match on rendered text
    Text,
}

impl Strategy {
    fn engine(&self) -> &'static str {
        match self {
            Strategy::Css => "css",
            Strategy::XPath => "xpath",
            Strategy::Text => "text",
        }
    }
}

/// A named rule identifying one or more elements
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    name: Cow<'static, str>,
    strategy: Strategy,
    expr: Cow<'static, str>,
}

impl Locator {
    pub const fn css(name: &'static str, expr: &'static str) -> Self {
        Self::fixed(name, Strategy::Css, expr)
    }

    pub const fn xpath(name: &'static str, expr: &'static str) -> Self {
        Self::fixed(name, Strategy::XPath, expr)
    }

    pub const fn text(name: &'static str, expr: &'static str) -> Self {
        Self::fixed(name, Strategy::Text, expr)
    }

    const fn fixed(name: &'static str, strategy: Strategy, expr: &'static str) -> Self {
        Self {
            name: Cow::Borrowed(name),
            strategy,
            expr: Cow::Borrowed(expr),
        }
    }

    /// Build a locator at runtime (parameterized entries, raw selectors)
    pub fn dynamic(name: impl Into<String>, strategy: Strategy, expr: impl Into<String>) -> Self {
        Self {
            name: Cow::Owned(name.into()),
            strategy,
            expr: Cow::Owned(expr.into()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn expr(&self) -> &str {
        &self.expr
    }

    /// Selector string in the browser engine's `engine=expr` syntax
    pub fn selector(&self) -> String {
        format!("{}={}", self.strategy.engine(), self.expr)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.selector())
    }
}

pub mod login {
    use super::Locator;

    pub const EMAIL: Locator = Locator::css("login.email", r#"[data-qa="login-email"]"#);
    pub const PASSWORD: Locator = Locator::css("login.password", r#"[data-qa="login-password"]"#);
    pub const BUTTON: Locator = Locator::css("login.button", r#"[data-qa="login-button"]"#);
}

pub mod signup {
    use super::Locator;

    pub const NAME: Locator = Locator::css("signup.name", r#"[data-qa="signup-name"]"#);
    pub const EMAIL: Locator = Locator::css("signup.email", r#"[data-qa="signup-email"]"#);
    pub const BUTTON: Locator = Locator::css("signup.button", r#"[data-qa="signup-button"]"#);
}

/// The account-information form reached after the signup step
pub mod signup_form {
    use super::Locator;

    pub const TITLE: Locator = Locator::css("signup_form.title", r#"input[name="title"]"#);
    pub const NAME: Locator = Locator::css("signup_form.name", r#"[data-qa="name"]"#);
    pub const EMAIL: Locator = Locator::css("signup_form.email", r#"[data-qa="email"]"#);
    pub const PASSWORD: Locator = Locator::css("signup_form.password", r#"[data-qa="password"]"#);
    pub const DAYS: Locator = Locator::css("signup_form.days", r#"[data-qa="days"]"#);
    pub const MONTHS: Locator = Locator::css("signup_form.months", r#"[data-qa="months"]"#);
    pub const YEARS: Locator = Locator::css("signup_form.years", r#"[data-qa="years"]"#);
    pub const NEWSLETTER: Locator = Locator::css("signup_form.newsletter", "#newsletter");
    pub const SPECIAL_OFFERS: Locator = Locator::css("signup_form.special_offers", "#optin");
    pub const FIRST_NAME: Locator = Locator::css("signup_form.first_name", r#"[data-qa="first_name"]"#);
    pub const LAST_NAME: Locator = Locator::css("signup_form.last_name", r#"[data-qa="last_name"]"#);
    pub const COMPANY: Locator = Locator::css("signup_form.company", r#"[data-qa="company"]"#);
    pub const ADDRESS1: Locator = Locator::css("signup_form.address1", r#"[data-qa="address"]"#);
    pub const ADDRESS2: Locator = Locator::css("signup_form.address2", r#"[data-qa="address2"]"#);
    pub const COUNTRY: Locator = Locator::css("signup_form.country", r#"[data-qa="country"]"#);
    pub const STATE: Locator = Locator::css("signup_form.state", r#"[data-qa="state"]"#);
    pub const CITY: Locator = Locator::css("signup_form.city", r#"[data-qa="city"]"#);
    pub const ZIPCODE: Locator = Locator::css("signup_form.zipcode", r#"[data-qa="zipcode"]"#);
    pub const MOBILE_NUMBER: Locator =
        Locator::css("signup_form.mobile_number", r#"[data-qa="mobile_number"]"#);
    pub const CREATE_ACCOUNT: Locator =
        Locator::css("signup_form.create_account", r#"[data-qa="create-account"]"#);
    pub const ACCOUNT_CREATED: Locator =
        Locator::xpath("signup_form.account_created", r#"//b[text()="Account Created!"]"#);
}

pub mod products {
    use super::{Locator, Strategy};

    pub const FEATURES_ITEMS: Locator = Locator::css("products.features_items", ".features_items");
    pub const SEARCH_INPUT: Locator = Locator::css("products.search_input", "#search_product");
    pub const SEARCH_SUBMIT: Locator = Locator::css("products.search_submit", "#submit_search");
    pub const SEARCHED_TITLE: Locator =
        Locator::xpath("products.searched_title", r#"//h2[contains(@class, "title")]"#);
    pub const PRODUCT_INFO: Locator = Locator::css("products.product_info", ".productinfo");
    pub const CATEGORY_SIDEBAR: Locator = Locator::css("products.category_sidebar", ".left-sidebar");
    pub const DETAILS_CONTAINER: Locator =
        Locator::css("products.details_container", ".product-information");
    pub const DETAILS_TITLE: Locator =
        Locator::css("products.details_title", ".product-information h2");

    /// Add-to-cart control(s) for one product id; a listing may render several
    pub fn add_to_cart_by_id(product_id: u32) -> Locator {
        Locator::dynamic(
            format!("products.add_to_cart_by_id({product_id})"),
            Strategy::Css,
            format!(r#"a.add-to-cart[data-product-id="{product_id}"]"#),
        )
    }

    /// Disclosure toggle of a sidebar category section
    pub fn category_expand(category: &str) -> Locator {
        Locator::dynamic(
            format!("products.category_expand({category})"),
            Strategy::Css,
            format!(r##"a[href="#{category}"]"##),
        )
    }

    /// The `index`-th (1-based) sub-category link inside a category section
    pub fn category_link(category: &str, index: u32) -> Locator {
        Locator::dynamic(
            format!("products.category_link({category}, {index})"),
            Strategy::Css,
            format!("#{category} .panel-body ul li:nth-child({index}) a"),
        )
    }

    pub fn product_details_link(product_id: u32) -> Locator {
        Locator::dynamic(
            format!("products.product_details_link({product_id})"),
            Strategy::Css,
            format!(r#"a[href="/product_details/{product_id}"]"#),
        )
    }
}

pub mod cart {
    use super::Locator;

    pub const MODAL: Locator = Locator::css("cart.modal", "#cartModal");
    pub const VIEW_CART: Locator = Locator::text("cart.view_cart", "View Cart");
    pub const DELETE_BUTTON: Locator = Locator::css("cart.delete_button", ".cart_quantity_delete");
    pub const QUANTITY_BUTTONS: Locator = Locator::css("cart.quantity_buttons", ".cart_quantity button");
    pub const EMPTY_MESSAGE: Locator = Locator::text("cart.empty_message", "Cart is empty!");
    pub const CHECKOUT_BUTTON: Locator = Locator::css("cart.checkout_button", ".check_out");
}

pub mod user {
    use super::Locator;

    pub const LOGOUT: Locator = Locator::css("user.logout", r#"a[href="/logout"]"#);
    pub const LOGOUT_TEXT: Locator = Locator::text("user.logout_text", "Logout");
    pub const LOGGED_IN_AS: Locator =
        Locator::xpath("user.logged_in_as", r#"//a[contains(., "Logged in as")]/b"#);
}

pub mod message {
    use super::Locator;

    pub const INVALID_CREDENTIALS: Locator =
        Locator::css("message.invalid_credentials", ".login-form form p");
    pub const LOGGED_IN_AS: Locator = Locator::text("message.logged_in_as", "Logged in as");
}

static REGISTRY: &[Locator] = &[
    login::EMAIL,
    login::PASSWORD,
    login::BUTTON,
    signup::NAME,
    signup::EMAIL,
    signup::BUTTON,
    signup_form::TITLE,
    signup_form::NAME,
    signup_form::EMAIL,
    signup_form::PASSWORD,
    signup_form::DAYS,
    signup_form::MONTHS,
    signup_form::YEARS,
    signup_form::NEWSLETTER,
    signup_form::SPECIAL_OFFERS,
    signup_form::FIRST_NAME,
    signup_form::LAST_NAME,
    signup_form::COMPANY,
    signup_form::ADDRESS1,
    signup_form::ADDRESS2,
    signup_form::COUNTRY,
    signup_form::STATE,
    signup_form::CITY,
    signup_form::ZIPCODE,
    signup_form::MOBILE_NUMBER,
    signup_form::CREATE_ACCOUNT,
    signup_form::ACCOUNT_CREATED,
    products::FEATURES_ITEMS,
    products::SEARCH_INPUT,
    products::SEARCH_SUBMIT,
    products::SEARCHED_TITLE,
    products::PRODUCT_INFO,
    products::CATEGORY_SIDEBAR,
    products::DETAILS_CONTAINER,
    products::DETAILS_TITLE,
    cart::MODAL,
    cart::VIEW_CART,
    cart::DELETE_BUTTON,
    cart::QUANTITY_BUTTONS,
    cart::EMPTY_MESSAGE,
    cart::CHECKOUT_BUTTON,
    user::LOGOUT,
    user::LOGOUT_TEXT,
    user::LOGGED_IN_AS,
    message::INVALID_CREDENTIALS,
    message::LOGGED_IN_AS,
];

/// All fixed (non-parameterized) registry entries
pub fn all() -> &'static [Locator] {
    REGISTRY
}

/// Look up a registry entry by dotted name, applying arguments to the
/// parameterized ones
pub fn resolve(name: &str, args: &[String]) -> E2eResult<Locator> {
    match (name, args) {
        ("products.add_to_cart_by_id", [id]) => Ok(products::add_to_cart_by_id(parse_index(name, id)?)),
        ("products.category_expand", [category]) => Ok(products::category_expand(category)),
        ("products.category_link", [category, index]) => {
            Ok(products::category_link(category, parse_index(name, index)?))
        }
        ("products.product_details_link", [id]) => {
            Ok(products::product_details_link(parse_index(name, id)?))
        }
        (_, []) => REGISTRY
            .iter()
            .find(|l| l.name() == name)
            .cloned()
            .ok_or_else(|| E2eError::UnknownLocator(name.to_string())),
        _ => Err(E2eError::UnknownLocator(format!(
            "{name} with {} argument(s)",
            args.len()
        ))),
    }
}

fn parse_index(name: &str, raw: &str) -> E2eResult<u32> {
    raw.trim().parse().map_err(|_| {
        E2eError::InvalidArgument(format!("{name}: expected a number, got '{raw}'"))
    })
}
