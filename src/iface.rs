/*
 *  iface.rs
 *
 *  MacShift - change your spots
 *	(c) 2020-26 Stuart Hunter
 *
 *  Interface control - hardware address get/set and link state over ioctl
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
use std::io;
use std::net::UdpSocket;
use std::os::unix::io::AsRawFd;

use log::{debug, error};
use thiserror::Error;

use crate::mac_addr::MacAddress;

// ethtool plumbing; libc covers the SIOC* device ioctls but not this surface
const SIOCETHTOOL: libc::c_ulong = 0x8946;
const ETHTOOL_GPERMADDR: u32 = 0x0000_0020;

#[derive(Debug, Error)]
pub enum IfaceError {
    #[error("invalid interface name '{0}'")]
    BadName(String),
    #[error("can't create control socket: {0}")]
    SocketOpen(#[source] io::Error),
    #[error("can't attach to interface '{name}': {source}")]
    Bind {
        name: String,
        #[source]
        source: io::Error,
    },
    #[error("{what} failed on '{name}': {source}")]
    Control {
        what: &'static str,
        name: String,
        #[source]
        source: io::Error,
    },
}

/// Mirror of `struct ethtool_perm_addr`, sized for a 6-octet address.
#[repr(C)]
struct EthtoolPermAddr {
    cmd: u32,
    size: u32,
    data: [u8; 6],
}

/// Control handle bound to one named interface.
///
/// Binding opens an AF_INET datagram socket, attaches the interface name and
/// caches the hardware address the kernel reports at that moment.
/// `current_address` serves that cached value; it goes stale after a
/// `set_address` and only a fresh bind observes the change. The handle stays
/// bound for the life of the invocation and the socket closes on drop.
pub struct InterfaceController {
    socket: UdpSocket,
    name: String,
    ifr_name: [libc::c_char; libc::IF_NAMESIZE],
    hwaddr: MacAddress,
}

impl InterfaceController {
    pub fn bind(name: &str) -> Result<Self, IfaceError> {
        let ifr_name = encode_ifname(name)?;
        let socket = UdpSocket::bind("0.0.0.0:0").map_err(IfaceError::SocketOpen)?;

        let mut ifreq = blank_ifreq(&ifr_name);
        // SAFETY: valid fd and an ifreq initialized with the interface name
        let ret = unsafe { libc::ioctl(socket.as_raw_fd(), libc::SIOCGIFHWADDR, &mut ifreq) };
        if ret < 0 {
            return Err(IfaceError::Bind {
                name: name.to_string(),
                source: io::Error::last_os_error(),
            });
        }

        // SAFETY: ifru_hwaddr was populated by the successful ioctl above
        let sa = unsafe { ifreq.ifr_ifru.ifru_hwaddr };
        let hwaddr = mac_from_sockaddr(&sa);
        debug!("bound to {} (hwaddr {})", name, hwaddr);

        Ok(Self {
            socket,
            name: name.to_string(),
            ifr_name,
            hwaddr,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Hardware address as of bind time.
    pub fn current_address(&self) -> MacAddress {
        self.hwaddr
    }

    /// Factory-programmed address, queried through the ethtool interface.
    /// Fails when the driver does not support the query; no fallback.
    pub fn permanent_address(&self) -> Result<MacAddress, IfaceError> {
        let mut perm = EthtoolPermAddr {
            cmd: ETHTOOL_GPERMADDR,
            size: 6,
            data: [0u8; 6],
        };
        let mut ifreq = blank_ifreq(&self.ifr_name);
        ifreq.ifr_ifru.ifru_data = &mut perm as *mut EthtoolPermAddr as *mut libc::c_char;

        // SAFETY: valid fd; ifru_data points at a live ethtool_perm_addr
        // with room for the 6 octets announced in `size`
        let ret = unsafe { libc::ioctl(self.socket.as_raw_fd(), SIOCETHTOOL, &mut ifreq) };
        if ret < 0 {
            return Err(self.control_err("get permanent address"));
        }

        Ok(MacAddress::new(perm.data))
    }

    /// Issues SIOCSIFHWADDR with the descriptor rewritten to carry `mac`.
    /// The cached current address is left stale on purpose.
    pub fn set_address(&self, mac: &MacAddress) -> Result<(), IfaceError> {
        let mut sa_data = [0 as libc::c_char; 14];
        for (dst, src) in sa_data.iter_mut().zip(mac.octets()) {
            *dst = src as libc::c_char;
        }

        let mut ifreq = blank_ifreq(&self.ifr_name);
        ifreq.ifr_ifru.ifru_hwaddr = libc::sockaddr {
            sa_family: libc::ARPHRD_ETHER as libc::sa_family_t,
            sa_data,
        };

        // SAFETY: valid fd; ifreq carries the interface name and new address
        let ret = unsafe { libc::ioctl(self.socket.as_raw_fd(), libc::SIOCSIFHWADDR, &ifreq) };
        if ret < 0 {
            return Err(self.control_err("set hardware address"));
        }

        debug!("{} hardware address rewritten to {}", self.name, mac);
        Ok(())
    }

    /// Toggles IFF_UP via the flags ioctls. Most drivers refuse a hardware
    /// address change while the link is administratively up.
    pub fn set_admin_state(&self, up: bool) -> Result<(), IfaceError> {
        let mut ifreq = blank_ifreq(&self.ifr_name);
        // SAFETY: valid fd and an ifreq initialized with the interface name
        let ret = unsafe { libc::ioctl(self.socket.as_raw_fd(), libc::SIOCGIFFLAGS, &mut ifreq) };
        if ret < 0 {
            return Err(self.control_err("get interface flags"));
        }

        // SAFETY: ifru_flags was populated by the successful ioctl above
        let mut flags = unsafe { ifreq.ifr_ifru.ifru_flags };
        if up {
            flags |= libc::IFF_UP as libc::c_short;
        } else {
            flags &= !(libc::IFF_UP as libc::c_short);
        }
        ifreq.ifr_ifru.ifru_flags = flags;

        // SAFETY: valid fd; ifreq carries the interface name and new flags
        let ret = unsafe { libc::ioctl(self.socket.as_raw_fd(), libc::SIOCSIFFLAGS, &ifreq) };
        if ret < 0 {
            return Err(self.control_err(if up {
                "bring interface up"
            } else {
                "bring interface down"
            }));
        }

        Ok(())
    }

    /// Forces the link down and returns the guard that brings it back up.
    pub fn link_guard(&self) -> Result<LinkGuard<'_>, IfaceError> {
        self.set_admin_state(false)?;
        debug!("{} forced down", self.name);
        Ok(LinkGuard { ctrl: self })
    }

    fn control_err(&self, what: &'static str) -> IfaceError {
        IfaceError::Control {
            what,
            name: self.name.clone(),
            source: io::Error::last_os_error(),
        }
    }
}

/// Witness that the interface was forced down. Dropping it forces the link
/// back up again, on success paths, early `?` returns and panics alike.
pub struct LinkGuard<'a> {
    ctrl: &'a InterfaceController,
}

impl Drop for LinkGuard<'_> {
    fn drop(&mut self) {
        // Drop can't propagate; a stranded-down interface loses the host
        match self.ctrl.set_admin_state(true) {
            Ok(()) => debug!("{} brought back up", self.ctrl.name()),
            Err(e) => error!("{e}"),
        }
    }
}

fn blank_ifreq(ifr_name: &[libc::c_char; libc::IF_NAMESIZE]) -> libc::ifreq {
    let mut ifreq = libc::ifreq {
        ifr_name: [0; libc::IF_NAMESIZE],
        ifr_ifru: libc::__c_anonymous_ifr_ifru {
            ifru_addr: libc::sockaddr {
                sa_family: 0,
                sa_data: [0; 14],
            },
        },
    };
    ifreq.ifr_name = *ifr_name;
    ifreq
}

/// Encodes an interface name into the fixed ifr_name field. The kernel
/// requires a NUL-terminated name shorter than IF_NAMESIZE.
fn encode_ifname(name: &str) -> Result<[libc::c_char; libc::IF_NAMESIZE], IfaceError> {
    let bytes = name.as_bytes();
    if bytes.is_empty() || bytes.len() >= libc::IF_NAMESIZE || bytes.contains(&0) {
        return Err(IfaceError::BadName(name.to_string()));
    }

    let mut out = [0 as libc::c_char; libc::IF_NAMESIZE];
    for (dst, &src) in out.iter_mut().zip(bytes) {
        *dst = src as libc::c_char;
    }
    Ok(out)
}

fn mac_from_sockaddr(sa: &libc::sockaddr) -> MacAddress {
    let mut octets = [0u8; 6];
    for (dst, &src) in octets.iter_mut().zip(&sa.sa_data[..6]) {
        *dst = src as u8;
    }
    MacAddress::new(octets)
}
