//! In-memory storefront implementing [`Driver`] for unit tests
//!
//! Pages are rendered as flat lists of nodes, each answering to the
//! registry selectors it would match in the real DOM. Cart contents and the
//! login state survive reloads like a cookie-backed session.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use async_trait::async_trait;

use crate::driver::{Driver, DriverFactory};
use crate::error::{E2eError, E2eResult};
use crate::locators::{self, cart, login, message, products, signup, signup_form, user, Locator};

pub const BASE_URL: &str = "http://storefront.test";

// Must match fixtures/user.json
pub const USER_NAME: &str = "QA Tester";
pub const USER_EMAIL: &str = "qa.tester@mailinator.com";
pub const USER_PASSWORD: &str = "Qa#Tester2024";

struct Product {
    id: u32,
    name: &'static str,
    price: u32,
    category: u32,
}

const CATALOG: &[Product] = &[
    Product { id: 1, name: "Blue Top", price: 500, category: 2 },
    Product { id: 2, name: "Men Tshirt", price: 400, category: 3 },
    Product { id: 3, name: "Sleeveless Dress", price: 1000, category: 1 },
    Product { id: 4, name: "Stylish Dress", price: 1500, category: 1 },
    Product { id: 5, name: "Winter Top", price: 600, category: 2 },
    Product { id: 6, name: "Summer White Top", price: 400, category: 2 },
];

/// (category id, section, sub-category) in sidebar order
const CATEGORIES: &[(u32, &str, &str)] = &[
    (1, "Women", "Dress"),
    (2, "Women", "Tops"),
    (7, "Women", "Saree"),
    (3, "Men", "Tshirts"),
    (6, "Men", "Jeans"),
    (4, "Kids", "Dress"),
    (5, "Kids", "Tops & Shirts"),
];

const SECTIONS: &[&str] = &["Women", "Men", "Kids"];

const MONTHS: &[&str] = &[
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];

const COUNTRIES: &[&str] = &[
    "India", "United States", "Canada", "Australia", "Israel", "New Zealand", "Singapore",
];

#[derive(Debug, Clone, PartialEq)]
enum Action {
    None,
    LoginSubmit,
    SignupSubmit,
    CreateAccount,
    Logout,
    AddToCart(u32),
    ViewCart,
    CloseModal,
    DeleteCartItem(usize),
    Checkout,
    SearchSubmit,
    ExpandCategory(&'static str),
    CategoryLink(u32),
    ProductDetails(u32),
}

#[derive(Debug, Clone)]
struct Node {
    selectors: Vec<String>,
    text: String,
    visible: bool,
    action: Action,
    field: Option<String>,
    required: bool,
    options: Vec<(String, String)>,
}

impl Node {
    fn new(text: impl Into<String>) -> Self {
        Self {
            selectors: Vec::new(),
            text: text.into(),
            visible: true,
            action: Action::None,
            field: None,
            required: false,
            options: Vec::new(),
        }
    }

    fn input(locator: &Locator) -> Self {
        Self::new("").at(locator).field(locator.name())
    }

    fn at(mut self, locator: &Locator) -> Self {
        self.selectors.push(locator.selector());
        self
    }

    fn field(mut self, name: &str) -> Self {
        self.field = Some(name.to_string());
        self
    }

    fn on_click(mut self, action: Action) -> Self {
        self.action = action;
        self
    }

    fn visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    fn required(mut self) -> Self {
        self.required = true;
        self
    }

    fn options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(|(v, l)| (v.into(), l.into())).collect();
        self
    }

    fn matches(&self, selector: &str) -> bool {
        match selector.strip_prefix("text=") {
            Some(text) => self.text.to_lowercase().contains(&text.to_lowercase()),
            None => self.selectors.iter().any(|s| s == selector),
        }
    }
}

/// One browser context against the fake storefront
#[derive(Debug, Default)]
pub struct FakeStorefront {
    path: String,
    logged_in: bool,
    cart: Vec<u32>,
    values: HashMap<String, String>,
    checked: HashSet<String>,
    login_error: bool,
    modal_open: bool,
    expanded: Option<&'static str>,
    pending_signup: Option<(String, String)>,
    logout_link_hidden: bool,
    closed: bool,
}

impl FakeStorefront {
    pub fn new() -> Self {
        Self {
            path: "about:blank".to_string(),
            ..Default::default()
        }
    }

    /// Render the logout affordance without its dedicated link
    pub fn hide_logout_link(&mut self) {
        self.logout_link_hidden = true;
    }

    pub fn is_logged_in(&self) -> bool {
        self.logged_in
    }

    fn navigate(&mut self, path: &str) {
        self.values.clear();
        self.checked.clear();
        self.login_error = false;
        self.modal_open = false;
        self.expanded = None;

        match path {
            "/logout" => {
                self.logged_in = false;
                self.path = "/login".to_string();
            }
            "/signup" => {
                if let Some((name, email)) = &self.pending_signup {
                    self.values.insert(signup_form::NAME.name().to_string(), name.clone());
                    self.values.insert(signup_form::EMAIL.name().to_string(), email.clone());
                }
                self.path = path.to_string();
            }
            _ => self.path = path.to_string(),
        }
    }

    fn value(&self, field: &str) -> &str {
        self.values.get(field).map(String::as_str).unwrap_or("")
    }

    fn render(&self) -> Vec<Node> {
        let mut nodes = Vec::new();

        if self.logged_in {
            let logout = Node::new("Logout").on_click(Action::Logout);
            nodes.push(if self.logout_link_hidden { logout } else { logout.at(&user::LOGOUT) });
            nodes.push(Node::new(format!("Logged in as {USER_NAME}")));
            nodes.push(Node::new(USER_NAME).at(&user::LOGGED_IN_AS));
        } else {
            nodes.push(Node::new("Signup / Login"));
        }

        let (route, query) = self.path.split_once('?').unwrap_or((self.path.as_str(), ""));
        match route {
            "/" => nodes.push(Node::new("Full-Fledged practice website for Automation Engineers")),
            "/login" => self.render_login(&mut nodes),
            "/signup" => self.render_signup_form(&mut nodes),
            "/account_created" => {
                nodes.push(Node::new("Account Created!").at(&signup_form::ACCOUNT_CREATED));
            }
            "/products" => {
                let search = query.strip_prefix("search=").map(|t| t.replace('+', " "));
                let title = if search.is_some() { "Searched Products" } else { "All Products" };
                let listing = CATALOG
                    .iter()
                    .filter(|p| search.as_ref().map_or(true, |t| p.name.contains(t.as_str())))
                    .collect::<Vec<_>>();
                self.render_listing(&mut nodes, title, &listing);
            }
            "/view_cart" => self.render_cart(&mut nodes),
            "/checkout" => nodes.push(Node::new("Checkout")),
            _ => {
                if let Some(id) = route.strip_prefix("/category_products/") {
                    let id: u32 = id.parse().unwrap_or(0);
                    if let Some((_, section, sub)) = CATEGORIES.iter().find(|c| c.0 == id) {
                        let title = format!("{section} - {sub} Products");
                        let listing = CATALOG.iter().filter(|p| p.category == id).collect::<Vec<_>>();
                        self.render_listing(&mut nodes, &title, &listing);
                    }
                } else if let Some(id) = route.strip_prefix("/product_details/") {
                    if let Some(p) = CATALOG.iter().find(|p| id == p.id.to_string()) {
                        nodes.push(
                            Node::new(format!("{} Rs. {}", p.name, p.price)).at(&products::DETAILS_CONTAINER),
                        );
                        nodes.push(Node::new(p.name).at(&products::DETAILS_TITLE));
                    }
                }
            }
        }
        nodes
    }

    fn render_login(&self, nodes: &mut Vec<Node>) {
        nodes.push(Node::new("Login to your account"));
        nodes.push(Node::input(&login::EMAIL).required());
        nodes.push(Node::input(&login::PASSWORD).required());
        nodes.push(Node::new("Login").at(&login::BUTTON).on_click(Action::LoginSubmit));
        if self.login_error {
            nodes.push(Node::new("Your email or password is incorrect!").at(&message::INVALID_CREDENTIALS));
        }

        nodes.push(Node::new("New User Signup!"));
        nodes.push(Node::input(&signup::NAME).required());
        nodes.push(Node::input(&signup::EMAIL).required());
        nodes.push(Node::new("Signup").at(&signup::BUTTON).on_click(Action::SignupSubmit));
    }

    fn render_signup_form(&self, nodes: &mut Vec<Node>) {
        nodes.push(Node::new("Enter Account Information"));
        nodes.push(Node::new("Mr.").at(&signup_form::TITLE).field("title.Mr"));
        nodes.push(Node::new("Mrs.").at(&signup_form::TITLE).field("title.Mrs"));
        for locator in [&signup_form::NAME, &signup_form::EMAIL, &signup_form::PASSWORD] {
            nodes.push(Node::input(locator).required());
        }

        let days = (1..=31).map(|d| (d.to_string(), d.to_string()));
        nodes.push(Node::input(&signup_form::DAYS).options(days));
        let months = MONTHS.iter().enumerate().map(|(i, m)| ((i + 1).to_string(), m.to_string()));
        nodes.push(Node::input(&signup_form::MONTHS).options(months));
        let years = (1900..=2021).rev().map(|y| (y.to_string(), y.to_string()));
        nodes.push(Node::input(&signup_form::YEARS).options(years));

        nodes.push(Node::new("Sign up for our newsletter!").at(&signup_form::NEWSLETTER).field("newsletter"));
        nodes.push(Node::new("Receive special offers from our partners!").at(&signup_form::SPECIAL_OFFERS).field("optin"));

        for locator in [
            &signup_form::FIRST_NAME,
            &signup_form::LAST_NAME,
            &signup_form::ADDRESS1,
            &signup_form::STATE,
            &signup_form::CITY,
            &signup_form::ZIPCODE,
            &signup_form::MOBILE_NUMBER,
        ] {
            nodes.push(Node::input(locator).required());
        }
        nodes.push(Node::input(&signup_form::COMPANY));
        nodes.push(Node::input(&signup_form::ADDRESS2));
        let countries = COUNTRIES.iter().map(|c| (c.to_string(), c.to_string()));
        nodes.push(Node::input(&signup_form::COUNTRY).options(countries));

        nodes.push(Node::new("Create Account").at(&signup_form::CREATE_ACCOUNT).on_click(Action::CreateAccount));
    }

    fn render_listing(&self, nodes: &mut Vec<Node>, title: &str, listing: &[&Product]) {
        let mut sidebar = String::from("Category");
        for section in SECTIONS {
            sidebar.push(' ');
            sidebar.push_str(section);
        }
        nodes.push(Node::new(sidebar).at(&products::CATEGORY_SIDEBAR));

        for section in SECTIONS {
            nodes.push(
                Node::new(*section)
                    .at(&products::category_expand(section))
                    .on_click(Action::ExpandCategory(*section)),
            );
            let subs = CATEGORIES.iter().filter(|c| c.1 == *section);
            for (index, (id, _, sub)) in subs.enumerate() {
                nodes.push(
                    Node::new(*sub)
                        .at(&products::category_link(section, index as u32 + 1))
                        .on_click(Action::CategoryLink(*id))
                        .visible(self.expanded == Some(*section)),
                );
            }
        }

        nodes.push(Node::new("").at(&products::SEARCH_INPUT).field(products::SEARCH_INPUT.name()));
        nodes.push(Node::new("").at(&products::SEARCH_SUBMIT).on_click(Action::SearchSubmit));

        let items: Vec<&str> = listing.iter().map(|p| p.name).collect();
        nodes.push(Node::new(format!("{} {}", title, items.join(" "))).at(&products::FEATURES_ITEMS));
        nodes.push(Node::new(title).at(&products::SEARCHED_TITLE));

        for p in listing {
            nodes.push(
                Node::new(format!("Rs. {} {} Add to cart", p.price, p.name)).at(&products::PRODUCT_INFO),
            );
            nodes.push(
                Node::new("Add to cart")
                    .at(&products::add_to_cart_by_id(p.id))
                    .on_click(Action::AddToCart(p.id)),
            );
            nodes.push(
                Node::new("View Product")
                    .at(&products::product_details_link(p.id))
                    .on_click(Action::ProductDetails(p.id)),
            );
        }

        if self.modal_open {
            nodes.push(Node::new("Added! Your product has been added to cart.").at(&cart::MODAL));
            nodes.push(Node::new("View Cart").on_click(Action::ViewCart));
            nodes.push(Node::new("Continue Shopping").on_click(Action::CloseModal));
        }
    }

    fn render_cart(&self, nodes: &mut Vec<Node>) {
        if self.cart.is_empty() {
            nodes.push(Node::new("Cart is empty! Click here to buy products."));
            return;
        }
        for (row, id) in self.cart.iter().enumerate() {
            let name = CATALOG.iter().find(|p| p.id == *id).map_or("?", |p| p.name);
            nodes.push(Node::new(name));
            nodes.push(Node::new("1").at(&cart::QUANTITY_BUTTONS));
            nodes.push(Node::new("").at(&cart::DELETE_BUTTON).on_click(Action::DeleteCartItem(row)));
        }
        nodes.push(Node::new("Proceed To Checkout").at(&cart::CHECKOUT_BUTTON).on_click(Action::Checkout));
    }

    fn node(&self, selector: &str, nth: usize) -> E2eResult<Node> {
        self.render()
            .into_iter()
            .filter(|n| n.matches(selector))
            .nth(nth)
            .ok_or_else(|| E2eError::Driver(format!("no element #{nth} for {selector}")))
    }

    fn validation_message(&self, field: &str) -> String {
        let value = self.value(field);
        if value.is_empty() {
            return "Please fill out this field.".to_string();
        }
        let is_email = field.ends_with(".email");
        if is_email && !value.contains('@') {
            return format!("Please include an '@' in the email address. '{value}' is missing an '@'.");
        }
        String::new()
    }

    fn form_valid(&self, fields: &[&Locator]) -> bool {
        fields.iter().all(|l| self.validation_message(l.name()).is_empty())
    }

    fn perform(&mut self, action: Action) {
        match action {
            Action::None => {}
            Action::LoginSubmit => {
                if !self.form_valid(&[&login::EMAIL, &login::PASSWORD]) {
                    return;
                }
                let ok = self.value(login::EMAIL.name()) == USER_EMAIL
                    && self.value(login::PASSWORD.name()) == USER_PASSWORD;
                if ok {
                    self.logged_in = true;
                    self.navigate("/");
                } else {
                    self.navigate("/login");
                    self.login_error = true;
                }
            }
            Action::SignupSubmit => {
                if self.form_valid(&[&signup::NAME, &signup::EMAIL]) {
                    self.pending_signup = Some((
                        self.value(signup::NAME.name()).to_string(),
                        self.value(signup::EMAIL.name()).to_string(),
                    ));
                    self.navigate("/signup");
                }
            }
            Action::CreateAccount => {
                let required = [
                    &signup_form::PASSWORD,
                    &signup_form::FIRST_NAME,
                    &signup_form::LAST_NAME,
                    &signup_form::ADDRESS1,
                    &signup_form::STATE,
                    &signup_form::CITY,
                    &signup_form::ZIPCODE,
                    &signup_form::MOBILE_NUMBER,
                ];
                if self.form_valid(&required) {
                    self.navigate("/account_created");
                }
            }
            Action::Logout => self.navigate("/logout"),
            Action::AddToCart(id) => {
                self.cart.push(id);
                self.modal_open = true;
            }
            Action::ViewCart => self.navigate("/view_cart"),
            Action::CloseModal => self.modal_open = false,
            Action::DeleteCartItem(row) => {
                if row < self.cart.len() {
                    self.cart.remove(row);
                }
            }
            Action::Checkout => self.navigate("/checkout"),
            Action::SearchSubmit => {
                let term = self.value(products::SEARCH_INPUT.name()).replace(' ', "+");
                self.navigate(&format!("/products?search={term}"));
            }
            Action::ExpandCategory(section) => self.expanded = Some(section),
            Action::CategoryLink(id) => self.navigate(&format!("/category_products/{id}")),
            Action::ProductDetails(id) => self.navigate(&format!("/product_details/{id}")),
        }
    }

    fn ensure_open(&self) -> E2eResult<()> {
        if self.closed {
            return Err(E2eError::Driver("browser already closed".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl Driver for FakeStorefront {
    async fn goto(&mut self, url: &str) -> E2eResult<()> {
        self.ensure_open()?;
        let path = url
            .strip_prefix(BASE_URL)
            .ok_or_else(|| E2eError::Driver(format!("net::ERR_NAME_NOT_RESOLVED at {url}")))?;
        self.navigate(if path.is_empty() { "/" } else { path });
        Ok(())
    }

    async fn reload(&mut self) -> E2eResult<()> {
        self.ensure_open()?;
        let path = self.path.clone();
        self.navigate(&path);
        Ok(())
    }

    async fn url(&mut self) -> E2eResult<String> {
        Ok(format!("{BASE_URL}{}", self.path))
    }

    async fn count(&mut self, selector: &str) -> E2eResult<usize> {
        self.ensure_open()?;
        Ok(self.render().iter().filter(|n| n.matches(selector)).count())
    }

    async fn is_visible(&mut self, selector: &str, nth: usize) -> E2eResult<bool> {
        Ok(self.node(selector, nth)?.visible)
    }

    async fn text(&mut self, selector: &str, nth: usize) -> E2eResult<String> {
        Ok(self.node(selector, nth)?.text)
    }

    async fn attribute(&mut self, selector: &str, nth: usize, name: &str) -> E2eResult<Option<String>> {
        let node = self.node(selector, nth)?;
        Ok(match name {
            "required" if node.required => Some(String::new()),
            _ => None,
        })
    }

    async fn property(&mut self, selector: &str, nth: usize, name: &str) -> E2eResult<serde_json::Value> {
        let node = self.node(selector, nth)?;
        let field = node.field.unwrap_or_default();
        Ok(match name {
            "value" => serde_json::Value::String(self.value(&field).to_string()),
            "checked" => serde_json::Value::Bool(self.checked.contains(&field)),
            "validationMessage" if node.required => {
                serde_json::Value::String(self.validation_message(&field))
            }
            "validationMessage" => serde_json::Value::String(String::new()),
            _ => serde_json::Value::Null,
        })
    }

    async fn click(&mut self, selector: &str, nth: usize) -> E2eResult<()> {
        let node = self.node(selector, nth)?;
        if !node.visible {
            return Err(E2eError::Driver(format!("{selector} is not visible")));
        }
        self.perform(node.action);
        Ok(())
    }

    async fn type_text(&mut self, selector: &str, nth: usize, text: &str) -> E2eResult<()> {
        let field = self
            .node(selector, nth)?
            .field
            .ok_or_else(|| E2eError::Driver(format!("{selector} is not an input")))?;
        self.values.entry(field).or_default().push_str(text);
        Ok(())
    }

    async fn select_option(&mut self, selector: &str, nth: usize, option: &str) -> E2eResult<String> {
        let node = self.node(selector, nth)?;
        let (value, _) = node
            .options
            .iter()
            .find(|(value, label)| value == option || label == option)
            .ok_or_else(|| E2eError::Driver(format!("no option {option:?} in {selector}")))?;
        let field = node.field.clone().unwrap_or_default();
        self.values.insert(field, value.clone());
        Ok(value.clone())
    }

    async fn check(&mut self, selector: &str, nth: usize) -> E2eResult<()> {
        let field = self
            .node(selector, nth)?
            .field
            .ok_or_else(|| E2eError::Driver(format!("{selector} is not checkable")))?;
        if field.starts_with("title.") {
            self.checked.retain(|f| !f.starts_with("title."));
        }
        self.checked.insert(field);
        Ok(())
    }

    async fn body_text(&mut self) -> E2eResult<String> {
        self.ensure_open()?;
        let texts: Vec<String> = self
            .render()
            .into_iter()
            .filter(|n| n.visible && !n.text.is_empty())
            .map(|n| n.text)
            .collect();
        Ok(texts.join("\n"))
    }

    async fn screenshot(&mut self, path: &Path) -> E2eResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.path.as_bytes())?;
        Ok(())
    }

    async fn close(&mut self) -> E2eResult<()> {
        self.closed = true;
        Ok(())
    }
}

/// Launches fresh fake contexts
#[derive(Debug, Default)]
pub struct FakeFactory;

#[async_trait]
impl DriverFactory for FakeFactory {
    type Driver = FakeStorefront;

    async fn launch(&self) -> E2eResult<FakeStorefront> {
        Ok(FakeStorefront::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{FixtureSet, UserFixture};

    #[test]
    fn test_fake_credentials_match_shipped_fixture() {
        let fixtures = FixtureSet::new(concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures"));
        let user: UserFixture = fixtures.load("user").unwrap();
        assert_eq!(user.name, USER_NAME);
        assert_eq!(user.email, USER_EMAIL);
        assert_eq!(user.password, USER_PASSWORD);
    }

    #[test]
    fn test_every_rendered_selector_is_a_registry_entry_or_parameterized() {
        let mut fake = FakeStorefront::new();
        fake.navigate("/products");
        let known: HashSet<String> = locators::all().iter().map(|l| l.selector()).collect();

        for node in fake.render() {
            for selector in node.selectors {
                let parameterized = selector.contains("data-product-id")
                    || selector.contains("href=\"#")
                    || selector.contains(".panel-body")
                    || selector.contains("/product_details/");
                assert!(known.contains(&selector) || parameterized, "stray selector {selector}");
            }
        }
    }
}
