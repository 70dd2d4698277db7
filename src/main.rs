/*
 *  main.rs
 *
 *  MacShift - change your spots
 *	(c) 2020-26 Stuart Hunter
 *
 *	TODO:
 *
 *	This program is free software: you can redistribute it and/or modify
 *	it under the terms of the GNU General Public License as published by
 *	the Free Software Foundation, either version 3 of the License, or
 *	(at your option) any later version.
 *
 *	This program is distributed in the hope that it will be useful,
 *	but WITHOUT ANY WARRANTY; without even the implied warranty of
 *	MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *	GNU General Public License for more details.
 *
 *	See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *	Public License.
 *
 */
use std::path::Path;

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use env_logger::Env;
use log::{debug, error};

mod config;
mod iface;
mod mac_addr;

use iface::InterfaceController;
use mac_addr::{MacAddress, MacParseError};
include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

fn cli() -> Command {
    Command::new(env!("CARGO_PKG_NAME")) // Use Cargo.toml name
        .version(env!("CARGO_PKG_VERSION"))
        .about("change the hardware (MAC) address of a network interface")
        .arg(Arg::new("debug")
        .action(ArgAction::SetTrue)
        .long("debug")
        .short('v')
        .alias("verbose")
        .help("Enable debug log level")
        .required(false))
        .arg(Arg::new("permanent")
        .action(ArgAction::SetTrue)
        .short('p')
        .long("permanent")
        .help("Print the permanent and current MAC addresses and exit")
        .required(false))
        .arg(Arg::new("random")
        .action(ArgAction::SetTrue)
        .short('r')
        .long("random")
        .help("Set a random MAC address")
        .required(false))
        .arg(Arg::new("reset")
        .action(ArgAction::SetTrue)
        .short('x')
        .long("reset")
        .help("Reset to the permanent MAC address")
        .required(false))
        .arg(Arg::new("interface")
        .short('i')
        .long("interface")
        .help("Interface to operate on")
        .required(false))
        .arg(Arg::new("config")
        .short('c')
        .long("config")
        .help("Config file path")
        .required(false))
        .arg(Arg::new("mac")
        .value_name("MAC")
        .help("MAC address to be set, lowercase or uppercase")
        .required(false))
        .after_help("MacShift:\
            \nSingle-shot MAC changer\
            \n\n\tBrings the interface down, applies the selected\
            \n\taddress operation, and brings it back up again.")
}

/// One operation per invocation. Precedence mirrors the legacy dispatch:
/// permanent > current (nothing selected) > reset > random > explicit.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Action {
    ShowPermanent,
    ShowCurrent,
    ResetToPermanent,
    SetRandom,
    SetExplicit(MacAddress),
}

impl Action {
    fn from_matches(matches: &ArgMatches) -> Result<Action, MacParseError> {
        // the positional MAC is validated even when another mode wins
        let mac = matches
            .get_one::<String>("mac")
            .map(|s| s.parse::<MacAddress>())
            .transpose()?;

        if matches.get_flag("permanent") {
            Ok(Action::ShowPermanent)
        } else if matches.get_flag("reset") {
            Ok(Action::ResetToPermanent)
        } else if matches.get_flag("random") {
            Ok(Action::SetRandom)
        } else if let Some(mac) = mac {
            Ok(Action::SetExplicit(mac))
        } else {
            Ok(Action::ShowCurrent)
        }
    }
}

fn main() -> Result<()> {
    let matches = cli().get_matches();

    let debug_enabled = matches.get_flag("debug");
    let cfg = config::load(matches.get_one::<String>("config").map(Path::new))?;

    // Initialize the logger with the appropriate level based on debug flag
    let default_level = if debug_enabled {
        "debug"
    } else {
        cfg.log_level.as_deref().unwrap_or("info")
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level))
        .format_timestamp_secs()
        .init();

    debug!("v.{} built {}", env!("CARGO_PKG_VERSION"), BUILD_DATE);

    let action = Action::from_matches(&matches)
        .context("could not convert the provided string to a valid mac address")?;
    let interface = config::resolve_interface(
        matches.get_one::<String>("interface").map(String::as_str),
        &cfg,
    );

    run(&interface, action)
}

/// Bind, bracket the link down, apply one operation. The guard restores the
/// link on every way out of this function, failure branches included.
fn run(interface: &str, action: Action) -> Result<()> {
    let ctrl = InterfaceController::bind(interface)?;
    let _link = ctrl.link_guard()?;

    match action {
        Action::ShowPermanent => {
            println!("your permanent mac address is: {}", ctrl.permanent_address()?);
            println!("your current mac address is: {}", ctrl.current_address());
        }
        Action::ShowCurrent => {
            println!("your current mac address is: {}", ctrl.current_address());
        }
        Action::ResetToPermanent => {
            let mac = ctrl.permanent_address()?;
            apply(&ctrl, &mac)?;
        }
        Action::SetRandom => {
            apply(&ctrl, &MacAddress::random())?;
        }
        Action::SetExplicit(mac) => {
            apply(&ctrl, &mac)?;
        }
    }

    Ok(())
}

fn apply(ctrl: &InterfaceController, mac: &MacAddress) -> Result<()> {
    if let Err(e) = ctrl.set_address(mac) {
        error!("retry with another mac address");
        return Err(e).context("failed to set mac address");
    }
    println!("mac address set to {mac}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches_for(argv: &[&str]) -> ArgMatches {
        cli().try_get_matches_from(argv.iter().copied()).unwrap()
    }

    #[test]
    fn no_arguments_shows_current() {
        let m = matches_for(&["macshift"]);
        assert_eq!(Action::from_matches(&m).unwrap(), Action::ShowCurrent);
    }

    #[test]
    fn interface_alone_shows_current() {
        let m = matches_for(&["macshift", "-i", "eth1"]);
        assert_eq!(Action::from_matches(&m).unwrap(), Action::ShowCurrent);
    }

    #[test]
    fn permanent_wins_over_explicit_mac() {
        // -p plus a MAC argument: the MAC is parsed but never applied
        let m = matches_for(&["macshift", "-p", "aa:bb:cc:dd:ee:ff"]);
        assert_eq!(Action::from_matches(&m).unwrap(), Action::ShowPermanent);
    }

    #[test]
    fn permanent_with_malformed_mac_still_fails() {
        let m = matches_for(&["macshift", "-p", "aa-bb-cc-dd-ee-ff"]);
        assert_eq!(
            Action::from_matches(&m),
            Err(MacParseError::InvalidFormat)
        );
    }

    #[test]
    fn reset_wins_over_random() {
        let m = matches_for(&["macshift", "-x", "-r"]);
        assert_eq!(
            Action::from_matches(&m).unwrap(),
            Action::ResetToPermanent
        );
    }

    #[test]
    fn explicit_mac_selected_with_interface() {
        // flags are order-independent; the MAC positional lands anywhere
        let m = matches_for(&["macshift", "-i", "eth1", "aa:bb:cc:dd:ee:ff"]);
        assert_eq!(
            Action::from_matches(&m).unwrap(),
            Action::SetExplicit("aa:bb:cc:dd:ee:ff".parse().unwrap())
        );
        assert_eq!(m.get_one::<String>("interface").unwrap(), "eth1");
    }

    #[test]
    fn random_selected() {
        let m = matches_for(&["macshift", "-r"]);
        assert_eq!(Action::from_matches(&m).unwrap(), Action::SetRandom);
    }

    #[test]
    fn interface_flag_requires_a_value() {
        assert!(cli().try_get_matches_from(["macshift", "-i"]).is_err());
    }
}
