//! Command helpers: reusable storefront interactions
//!
//! Each helper bundles a multi-step UI interaction behind one call. Lookup
//! failures propagate unchanged; only [`Session::logout`] treats a missing
//! control as a valid outcome.

use serde::Serialize;
use tracing::{debug, warn};

use crate::driver::Driver;
use crate::error::{E2eError, E2eResult};
use crate::locators::{cart, login, products, user};
use crate::session::Session;
use crate::wait::Wait;

/// What [`Session::logout`] found on the page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogoutOutcome {
    /// The dedicated logout link was clicked
    ClickedControl,
    /// No dedicated link, but an element reading "Logout" was clicked
    ClickedText,
    /// Nothing to click; the session was not authenticated
    AlreadyLoggedOut,
}

impl<D: Driver> Session<D> {
    pub async fn login(&mut self, email: &str, password: &str) -> E2eResult<()> {
        debug!("login as {}", email);
        self.get(&login::EMAIL).await?.type_text(email).await?;
        self.get(&login::PASSWORD).await?.type_text(password).await?;
        self.get(&login::BUTTON).await?.click().await
    }

    pub async fn logout(&mut self) -> E2eResult<LogoutOutcome> {
        if let Some(link) = self.probe(&user::LOGOUT).await? {
            link.click().await?;
            return Ok(LogoutOutcome::ClickedControl);
        }

        if self.body_text().await?.contains("Logout") {
            self.get_within(&user::LOGOUT_TEXT, Wait::immediate())
                .await?
                .click()
                .await?;
            return Ok(LogoutOutcome::ClickedText);
        }

        warn!("logout: no logout control found, skipping");
        Ok(LogoutOutcome::AlreadyLoggedOut)
    }

    /// Add a product from the listing and land on the cart page
    pub async fn add_to_cart(&mut self, product_id: u32) -> E2eResult<()> {
        self.visit("/products").await?;
        self.get(&products::add_to_cart_by_id(product_id))
            .await?
            .first()
            .click()
            .await?;
        self.expect(&cart::MODAL).to_be_visible().await?;
        self.get(&cart::VIEW_CART).await?.click().await
    }

    pub async fn open_cart(&mut self) -> E2eResult<()> {
        self.get(&cart::VIEW_CART).await?.click().await
    }

    /// Delete the first cart row in document order
    pub async fn remove_first_item_from_cart(&mut self) -> E2eResult<()> {
        self.get(&cart::DELETE_BUTTON).await?.first().click().await
    }

    pub async fn search_products(&mut self, term: &str) -> E2eResult<()> {
        self.get(&products::SEARCH_INPUT).await?.type_text(term).await?;
        self.get(&products::SEARCH_SUBMIT).await?.click().await
    }

    /// Open a sidebar category and follow its `item_index`-th (1-based) link
    pub async fn filter_by_category(&mut self, category: &str, item_index: u32) -> E2eResult<()> {
        if item_index == 0 {
            return Err(E2eError::InvalidArgument(
                "filter_by_category: item_index is 1-based".to_string(),
            ));
        }
        self.get(&products::category_expand(category)).await?.click().await?;
        self.get(&products::category_link(category, item_index))
            .await?
            .click()
            .await
    }
}
