//! Screens and fixtures shared by the engine tests.

use anyhow::{anyhow, Result};

use crate::{
    config::AppConfig,
    screen::{Redirect, Screen, ScreenContext, ScreenDescriptor, ScreenRegistry, ScreenResult},
    UssdApp,
};

pub(crate) const MENU: &str = "Welcome\n1: Balance\n2: Send money\n3: Terms\n4: Exit";

#[derive(Default)]
pub(crate) struct Home;

impl Screen for Home {
    fn render(&self, ctx: &mut ScreenContext<'_>, args: &[String]) -> Result<ScreenResult> {
        let choice = args.first().map(String::as_str);
        Ok(match choice {
            Some("1") => Redirect::to(".balance").into(),
            Some("2") => Redirect::to(".send_money").into(),
            Some("3") => Redirect::to(".terms").into(),
            Some("4") => ScreenResult::end("Goodbye"),
            Some(_) => {
                ctx.print("Invalid choice").print(MENU);
                ctx.con()
            }
            None => {
                ctx.print(MENU);
                ctx.con()
            }
        })
    }
}

#[derive(Default)]
pub(crate) struct Balance;

impl Screen for Balance {
    fn render(&self, ctx: &mut ScreenContext<'_>, _args: &[String]) -> Result<ScreenResult> {
        ctx.print("Balance: KES 1,000");
        Ok(ctx.con())
    }
}

#[derive(Default)]
pub(crate) struct SendMoney;

impl Screen for SendMoney {
    fn render(&self, ctx: &mut ScreenContext<'_>, args: &[String]) -> Result<ScreenResult> {
        let amount: Option<u64> = ctx.get_as("amount")?;
        match (amount, args.first()) {
            (None, None) => {
                ctx.print("Enter amount");
            }
            (None, Some(raw)) => match raw.parse::<u64>() {
                Ok(amount) => {
                    ctx.set("amount", amount)?;
                    ctx.print(format!("Send KES {amount}?")).print("1: Confirm");
                }
                Err(_) => {
                    ctx.print("Invalid amount").print("Enter amount");
                }
            },
            (Some(amount), Some(confirm)) if confirm == "1" => {
                return Ok(ScreenResult::end(format!("Sent KES {amount}")));
            }
            (Some(amount), _) => {
                ctx.print(format!("Send KES {amount}?")).print("1: Confirm");
            }
        }
        Ok(ctx.con())
    }
}

#[derive(Default)]
pub(crate) struct Terms;

impl Screen for Terms {
    fn render(&self, ctx: &mut ScreenContext<'_>, _args: &[String]) -> Result<ScreenResult> {
        ctx.print(terms_text());
        Ok(ctx.con())
    }
}

/// A body of exactly 500 characters.
pub(crate) fn terms_text() -> String {
    let text: String = (0..100)
        .map(|i| format!("clause{i:02} applies"))
        .collect::<Vec<_>>()
        .join(" ");
    text.chars().take(500).collect()
}

/// Ends with a body too long for one page.
#[derive(Default)]
pub(crate) struct Receipt;

impl Screen for Receipt {
    fn render(&self, ctx: &mut ScreenContext<'_>, _args: &[String]) -> Result<ScreenResult> {
        ctx.print(terms_text());
        Ok(ctx.end())
    }
}

#[derive(Default)]
pub(crate) struct Forward;

impl Screen for Forward {
    fn render(&self, _ctx: &mut ScreenContext<'_>, _args: &[String]) -> Result<ScreenResult> {
        Ok(Redirect::to(".echo").arg("x").arg("y").arg("z").into())
    }
}

/// Reports what it was entered with.
#[derive(Default)]
pub(crate) struct Echo;

impl Screen for Echo {
    fn render(&self, ctx: &mut ScreenContext<'_>, args: &[String]) -> Result<ScreenResult> {
        let line = format!(
            "input: {}; redirected with: {}",
            args.join(","),
            ctx.redirect_args().join(",")
        );
        ctx.print(line);
        Ok(ctx.con())
    }
}

#[derive(Default)]
pub(crate) struct Ping;

impl Screen for Ping {
    fn render(&self, _ctx: &mut ScreenContext<'_>, _args: &[String]) -> Result<ScreenResult> {
        Ok(Redirect::to(".pong").into())
    }
}

#[derive(Default)]
pub(crate) struct Pong;

impl Screen for Pong {
    fn render(&self, _ctx: &mut ScreenContext<'_>, _args: &[String]) -> Result<ScreenResult> {
        Ok(Redirect::to(".ping").into())
    }
}

#[derive(Default)]
pub(crate) struct Broken;

impl Screen for Broken {
    fn render(&self, _ctx: &mut ScreenContext<'_>, _args: &[String]) -> Result<ScreenResult> {
        Err(anyhow!("ledger offline"))
    }
}

pub(crate) fn demo_config() -> AppConfig {
    AppConfig {
        name: "demo".to_string(),
        initial_screen: "demo.home".to_string(),
        ..AppConfig::default()
    }
}

pub(crate) fn demo_registry() -> ScreenRegistry {
    let module = module_path!();
    let mut registry = ScreenRegistry::new();
    registry.namespace(module, "demo").unwrap();
    let screens = [
        ScreenDescriptor::of::<Home>(),
        ScreenDescriptor::of::<Balance>(),
        ScreenDescriptor::of::<SendMoney>().state(["amount"]),
        ScreenDescriptor::of::<Terms>(),
        ScreenDescriptor::of::<Ping>().nav_menu(false),
        ScreenDescriptor::of::<Pong>().nav_menu(false),
        ScreenDescriptor::of::<Broken>(),
        ScreenDescriptor::of::<Receipt>(),
        ScreenDescriptor::of::<Forward>(),
        ScreenDescriptor::of::<Echo>().arity(1),
    ];
    for screen in screens {
        registry.register(screen.module(module)).unwrap();
    }
    registry
}

pub(crate) fn demo_app() -> UssdApp {
    UssdApp::builder(demo_config(), demo_registry())
        .build()
        .unwrap()
}
