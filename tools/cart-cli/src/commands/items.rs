//! Cart item commands.

use anyhow::Result;
use dialoguer::Confirm;
use serde::Serialize;
use turbo_cart::{CartItem, CartStore, NewCartItem, PendingWrite, ProductId};

use super::{AddArgs, ClearArgs, ItemArgs, ListArgs};
use crate::context::Context;

/// JSON shape printed after every command.
#[derive(Serialize)]
struct CartReport<'a> {
    key: &'a str,
    revision: u64,
    item_count: u64,
    items: &'a [CartItem],
}

/// Run the list command.
pub async fn list(args: ListArgs, ctx: &Context) -> Result<()> {
    let store = ctx.open_cart().await?;
    let products = store.handle().products();

    if args.count {
        if ctx.output.is_json() {
            ctx.output
                .json(&serde_json::json!({ "item_count": products.item_count() }));
        } else {
            println!("{}", products.item_count());
        }
        return Ok(());
    }

    report(&store, ctx);
    Ok(())
}

/// Run the add command.
pub async fn add(args: AddArgs, ctx: &Context) -> Result<()> {
    let store = ctx.open_cart().await?;
    let cart = store.handle();

    let mut item = NewCartItem::new(args.id, args.title, args.image_url, args.price);
    if let Some(quantity) = args.quantity {
        item = item.with_quantity(quantity);
    }
    let id = item.id.clone();

    let already_present = cart.products().contains(&id);
    commit(cart.add_to_cart(item)?).await?;

    if already_present {
        ctx.output
            .success(&format!("{} was already in the cart; quantity increased", id));
    } else {
        ctx.output.success(&format!("Added {}", id));
    }
    report(&store, ctx);
    Ok(())
}

/// Run the increment command.
pub async fn increment(args: ItemArgs, ctx: &Context) -> Result<()> {
    let store = ctx.open_cart().await?;
    let id = ProductId::new(args.id);

    commit(store.handle().increment(&id)?).await?;

    ctx.output.success(&format!("Incremented {}", id));
    report(&store, ctx);
    Ok(())
}

/// Run the decrement command.
pub async fn decrement(args: ItemArgs, ctx: &Context) -> Result<()> {
    let store = ctx.open_cart().await?;
    let cart = store.handle();
    let id = ProductId::new(args.id);

    commit(cart.decrement(&id)?).await?;

    if cart.products().contains(&id) {
        ctx.output.success(&format!("Decremented {}", id));
    } else {
        ctx.output.success(&format!("Removed {}", id));
    }
    report(&store, ctx);
    Ok(())
}

/// Run the clear command.
pub async fn clear(args: ClearArgs, ctx: &Context) -> Result<()> {
    let store = ctx.open_cart().await?;
    let cart = store.handle();

    if cart.products().is_empty() {
        ctx.output.info("Cart is already empty");
        return Ok(());
    }

    if !args.yes && !ctx.output.is_json() {
        let confirmed = Confirm::new()
            .with_prompt(format!("Remove {} item(s) from the cart?", cart.products().len()))
            .default(false)
            .interact()?;

        if !confirmed {
            ctx.output.warn("Clear cancelled");
            return Ok(());
        }
    }

    commit(cart.clear()?).await?;

    ctx.output.success("Cart cleared");
    report(&store, ctx);
    Ok(())
}

/// Wait for a change to reach storage before the process exits.
async fn commit(write: PendingWrite) -> Result<()> {
    write.wait().await?;
    Ok(())
}

fn report(store: &CartStore, ctx: &Context) {
    let products = store.handle().products();

    if ctx.output.is_json() {
        ctx.output.json(&CartReport {
            key: store.key(),
            revision: products.revision(),
            item_count: products.item_count(),
            items: products.items(),
        });
        return;
    }

    ctx.output.header(&format!("Cart ({})", store.key()));
    if products.is_empty() {
        ctx.output.info("Cart is empty");
        return;
    }

    ctx.output.items(products.items());
    ctx.output.kv("units", &products.item_count().to_string());
}
