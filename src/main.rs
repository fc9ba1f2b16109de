use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use csrtool::bridge;
use csrtool::csr::CertificationRequest;
use csrtool::csr::extensions::SanEntry;
use log::info;

mod args;

fn main() -> Result<()> {
    env_logger::init();
    let opts = args::options().run();

    if let Some(path) = &opts.verify {
        return verify(path);
    }
    if opts.json {
        return json();
    }

    let request = opts.to_request()?;
    let generated = bridge::generate(&request)?;

    match &opts.output_key {
        Some(path) => {
            write_private_key(path, generated.private_key_pem.as_bytes())
                .with_context(|| format!("failed to write private key to {}", path.display()))?;
            println!("Private key saved to: {}", path.display());
        }
        None => print!("{}", generated.private_key_pem.as_str()),
    }

    match &opts.output_csr {
        Some(path) => {
            fs::write(path, &generated.csr_pem)
                .with_context(|| format!("failed to write CSR to {}", path.display()))?;
            println!("CSR saved to: {}", path.display());
        }
        None => print!("{}", generated.csr_pem),
    }

    Ok(())
}

fn json() -> Result<()> {
    let mut request = String::new();
    io::stdin()
        .read_to_string(&mut request)
        .context("failed to read request from stdin")?;
    let response = bridge::handle(&request);
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{response}")?;
    Ok(())
}

fn verify(path: &Path) -> Result<()> {
    let pem = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let csr = CertificationRequest::from_pem(&pem)
        .with_context(|| format!("{} is not a certificate request", path.display()))?;
    csr.verify().context("signature verification failed")?;
    info!("signature of {} verified", path.display());

    let public_key = csr.public_key()?;
    println!("Signature: OK ({:?})", csr.signature_algorithm()?);
    println!("Subject: {}", csr.subject()?);
    println!("Public key: {} ({} bits)", public_key.key_type(), public_key.bits());
    for name in csr.subject_alt_names()? {
        match name {
            SanEntry::DnsName(dns) => println!("DNS: {dns}"),
            SanEntry::Rfc822Name(email) => println!("email: {email}"),
        }
    }
    if csr.challenge_password()?.is_some() {
        println!("Challenge password: present");
    }
    Ok(())
}

#[cfg(unix)]
fn write_private_key(path: &Path, contents: &[u8]) -> io::Result<()> {
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(contents)
}

#[cfg(not(unix))]
fn write_private_key(path: &Path, contents: &[u8]) -> io::Result<()> {
    fs::write(path, contents)
}
