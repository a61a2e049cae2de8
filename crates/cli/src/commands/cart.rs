//! `cart`: inspect and edit the remote cart directly.

use listcart_core::{ApiError, Cart};

use super::{runtime, Context};
use crate::OutputFormat;

#[derive(Debug, Clone)]
pub(crate) enum CartAction {
    Show,
    Add { product_id: String, quantity: u32 },
    Remove { product_id: String },
}

pub(crate) fn cmd_cart(action: CartAction, ctx: &Context<'_>) {
    let services = ctx.services();
    if services.offline {
        ctx.note("Offline catalog: the cart only lives for this command.");
    }
    let cart = services.remote_cart();
    let rt = runtime(ctx);

    let result = rt.block_on(async {
        match &action {
            CartAction::Show => cart.load().await.map(Some),
            CartAction::Add {
                product_id,
                quantity,
            } => cart.add(product_id, *quantity).await.map(|_| None),
            CartAction::Remove { product_id } => cart.remove(product_id).await.map(|_| None),
        }
    });

    match result {
        Ok(Some(loaded)) => print_cart(&loaded, ctx.output),
        Ok(None) => match &action {
            CartAction::Add {
                product_id,
                quantity,
            } => ctx.note(&format!("Added {} x {} to cart.", quantity, product_id)),
            CartAction::Remove { product_id } => {
                ctx.note(&format!("Removed {} from cart.", product_id))
            }
            CartAction::Show => {}
        },
        Err(e) => ctx.fail(&describe(&e, ctx)),
    }
}

fn describe(error: &ApiError, ctx: &Context<'_>) -> String {
    match error {
        ApiError::Unauthorized => "Session expired. Please log in again.".to_string(),
        ApiError::NotAuthenticated => format!(
            "Not logged in. Set {} to a valid access token.",
            ctx.config.catalog.token_env
        ),
        ApiError::NotFound(id) => format!("'{}' is not in the cart", id),
        other => other.to_string(),
    }
}

fn print_cart(cart: &Cart, output: OutputFormat) {
    match output {
        OutputFormat::Json => {
            let pretty = serde_json::to_string_pretty(cart)
                .unwrap_or_else(|e| format!("serialization error: {}", e));
            println!("{}", pretty);
        }
        OutputFormat::Text => print!("{}", render_cart(cart)),
    }
}

fn render_cart(cart: &Cart) -> String {
    if cart.is_empty() {
        return "Cart is empty\n".to_string();
    }
    let mut out = String::new();
    for line in &cart.lines {
        let price = line
            .price
            .map(|p| format!("  ${:.2}", p))
            .unwrap_or_default();
        out.push_str(&format!(
            "  {}  {}  x{}{}\n",
            line.product_id, line.description, line.quantity, price
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use listcart_core::CartLine;
    use rust_decimal::Decimal;

    #[test]
    fn empty_cart_says_so() {
        assert_eq!(render_cart(&Cart::empty()), "Cart is empty\n");
    }

    #[test]
    fn lines_show_price_when_known() {
        let cart = Cart {
            cart_id: "c1".to_string(),
            lines: vec![
                CartLine {
                    product_id: "0001111".to_string(),
                    description: "Whole Milk".to_string(),
                    quantity: 2,
                    price: Some(Decimal::new(349, 2)),
                },
                CartLine {
                    product_id: "0002222".to_string(),
                    description: "Bread".to_string(),
                    quantity: 1,
                    price: None,
                },
            ],
        };
        let text = render_cart(&cart);
        assert!(text.contains("0001111  Whole Milk  x2  $3.49"));
        assert!(text.contains("0002222  Bread  x1\n"));
    }
}
