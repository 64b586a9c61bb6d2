use crate::poller::ContractSnapshot;
use std::fmt::{self, Display, Formatter};
use tonnerre_common::coins::format_ton_signed;

// Characters of an address shown before it is elided
pub const ADDRESS_PREVIEW_LENGTH: usize = 30;

const LOADING: &str = "Loading...";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewModel {
    pub platform: String,
    pub contract_address: Option<String>,
    pub snapshot: Option<ContractSnapshot>,
    pub connected: bool,
}

fn preview(value: &str) -> &str {
    match value.char_indices().nth(ADDRESS_PREVIEW_LENGTH) {
        Some((index, _)) => &value[..index],
        None => value,
    }
}

fn write_address(f: &mut Formatter<'_>, address: Option<&str>) -> fmt::Result {
    match address {
        Some(address) => writeln!(f, "{}...", preview(address)),
        None => writeln!(f, "{}", LOADING),
    }
}

impl Display for ViewModel {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let snapshot = self.snapshot.as_ref();

        writeln!(f, "Platform: {}", self.platform)?;
        writeln!(f)?;

        writeln!(f, "Our contract Address")?;
        write_address(f, self.contract_address.as_deref())?;

        writeln!(f, "Our contract Balance")?;
        let balance = snapshot.map(|s| s.balance).unwrap_or(0);
        writeln!(f, "{} TON", format_ton_signed(balance as i128))?;

        writeln!(f, "Owner")?;
        let owner = snapshot.map(|s| s.owner_address.to_string());
        write_address(f, owner.as_deref())?;

        writeln!(f, "Counter")?;
        match snapshot {
            Some(s) => writeln!(f, "{}", s.counter)?,
            None => writeln!(f, "{}", LOADING)?,
        }

        writeln!(f, "Recent sender")?;
        let recent_sender = snapshot.map(|s| s.recent_sender.to_string());
        write_address(f, recent_sender.as_deref())?;

        if self.connected {
            writeln!(f)?;
            writeln!(f, "[Increment]")?;
        }
        Ok(())
    }
}

pub fn render(model: &ViewModel) -> String {
    model.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonnerre_common::address::Address;

    fn model(snapshot: Option<ContractSnapshot>, connected: bool) -> ViewModel {
        ViewModel {
            platform: "linux".to_owned(),
            contract_address: Some("EQCXIWd86sfFmlx2YL1SAX9jJS_jWXEVtGRNS3DCyduybavP".to_owned()),
            snapshot,
            connected,
        }
    }

    #[test]
    fn test_render_loading() {
        let out = render(&model(None, false));
        assert_eq!(
            out,
            "Platform: linux\n\
             \n\
             Our contract Address\n\
             EQCXIWd86sfFmlx2YL1SAX9jJS_jWX...\n\
             Our contract Balance\n\
             0 TON\n\
             Owner\n\
             Loading...\n\
             Counter\n\
             Loading...\n\
             Recent sender\n\
             Loading...\n"
        );
    }

    #[test]
    fn test_render_snapshot() {
        let owner: Address = "EQCXIWd86sfFmlx2YL1SAX9jJS_jWXEVtGRNS3DCyduybavP"
            .parse()
            .unwrap();
        let out = render(&model(
            Some(ContractSnapshot {
                recent_sender: owner,
                owner_address: owner,
                balance: 1_500_000_000,
                counter: 42,
            }),
            true,
        ));
        assert!(out.contains("Our contract Balance\n1.5 TON\n"));
        assert!(out.contains("Owner\nEQCXIWd86sfFmlx2YL1SAX9jJS_jWX...\n"));
        assert!(out.contains("Counter\n42\n"));
        assert!(out.ends_with("[Increment]\n"));
    }

    #[test]
    fn test_no_contract_opened() {
        let mut view = model(None, true);
        view.contract_address = None;
        let out = format!("{}", view);
        assert!(out.starts_with("Platform: linux\n\nOur contract Address\nLoading...\n"));
        assert_eq!(out.matches("Loading...").count(), 4);
    }
}
