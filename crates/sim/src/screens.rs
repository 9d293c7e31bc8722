//! A small mobile-money menu to drive the simulator with.

use anyhow::Result;
use ussd_core::{
    ConfigurationError, Redirect, Screen, ScreenContext, ScreenDescriptor, ScreenRegistry,
    ScreenResult,
};

const NAMESPACE: &str = "demo";
/// Full name of the menu the default configuration starts on.
pub const INITIAL_SCREEN: &str = "demo.home";
const MENU: [&str; 4] = ["1: Balance", "2: Send money", "3: Terms of service", "4: Exit"];

#[derive(Default)]
struct Home;

impl Screen for Home {
    fn render(&self, ctx: &mut ScreenContext<'_>, args: &[String]) -> Result<ScreenResult> {
        match args.first().map(String::as_str) {
            Some("1") => return Ok(Redirect::to(".balance").into()),
            Some("2") => return Ok(Redirect::to(".send_money").into()),
            Some("3") => return Ok(Redirect::to(".terms").into()),
            Some("4") => return Ok(ScreenResult::end("Thank you for banking with us.")),
            Some(other) => {
                ctx.print(format!("'{other}' is not on the menu."));
            }
            None => {
                ctx.print("Welcome to Demo Money");
            }
        }
        for item in MENU {
            ctx.print(item);
        }
        Ok(ctx.con())
    }
}

#[derive(Default)]
struct Balance;

impl Screen for Balance {
    fn render(&self, ctx: &mut ScreenContext<'_>, _args: &[String]) -> Result<ScreenResult> {
        let sent: u64 = ctx.data().get("sent").and_then(|v| v.as_u64()).unwrap_or(0);
        ctx.print(format!("Balance: KES {}", 10_000u64.saturating_sub(sent)));
        Ok(ctx.con())
    }
}

#[derive(Default)]
struct SendMoney;

impl Screen for SendMoney {
    fn render(&self, ctx: &mut ScreenContext<'_>, args: &[String]) -> Result<ScreenResult> {
        let recipient: Option<String> = ctx.get_as("recipient")?;
        let amount: Option<u64> = ctx.get_as("amount")?;
        let input = args.first().map(String::as_str);

        match (recipient, amount, input) {
            (None, _, None) => {
                ctx.print("Enter recipient number");
            }
            (None, _, Some(number)) => {
                if number.len() < 9 || !number.chars().all(|c| c.is_ascii_digit()) {
                    ctx.print("Invalid number").print("Enter recipient number");
                } else {
                    ctx.set("recipient", number)?;
                    ctx.print("Enter amount");
                }
            }
            (Some(_), None, None) => {
                ctx.print("Enter amount");
            }
            (Some(recipient), None, Some(raw)) => match raw.parse::<u64>() {
                Ok(amount) if amount > 0 => {
                    ctx.set("amount", amount)?;
                    ctx.print(format!("Send KES {amount} to {recipient}?"))
                        .print("1: Confirm");
                }
                _ => {
                    ctx.print("Invalid amount").print("Enter amount");
                }
            },
            (Some(recipient), Some(amount), Some("1")) => {
                let sent = ctx.data().get("sent").and_then(|v| v.as_u64()).unwrap_or(0);
                ctx.data_mut().insert("sent".into(), (sent + amount).into());
                return Ok(ScreenResult::end(format!(
                    "KES {amount} sent to {recipient}. Thank you."
                )));
            }
            (Some(recipient), Some(amount), _) => {
                ctx.print(format!("Send KES {amount} to {recipient}?"))
                    .print("1: Confirm");
            }
        }
        Ok(ctx.con())
    }
}

#[derive(Default)]
struct Terms;

impl Screen for Terms {
    fn render(&self, ctx: &mut ScreenContext<'_>, _args: &[String]) -> Result<ScreenResult> {
        ctx.print("Terms of service");
        for (i, clause) in CLAUSES.iter().enumerate() {
            ctx.print(format!("{}. {clause}", i + 1));
        }
        Ok(ctx.con())
    }
}

const CLAUSES: [&str; 5] = [
    "Transfers are final once confirmed and cannot be reversed by the operator.",
    "Daily limits apply and may change without notice to the subscriber.",
    "Keep your PIN secret. The operator will never ask for it over the phone.",
    "Charges are deducted from the sender's balance at the time of transfer.",
    "Disputes must be raised within thirty days of the transaction date.",
];

/// Registry with the demo screens under the `demo` namespace.
pub fn registry() -> Result<ScreenRegistry, ConfigurationError> {
    let module = module_path!();
    let mut registry = ScreenRegistry::new();
    registry.namespace(module, NAMESPACE)?;
    let screens = [
        ScreenDescriptor::of::<Home>().label("Main menu"),
        ScreenDescriptor::of::<Balance>(),
        ScreenDescriptor::of::<SendMoney>().state(["recipient", "amount"]),
        ScreenDescriptor::of::<Terms>().label("Terms of service"),
    ];
    for screen in screens {
        registry.register(screen.module(module))?;
    }
    Ok(registry)
}
