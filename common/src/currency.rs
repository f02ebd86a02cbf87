/// Currency symbol used for every displayed amount. Amounts are stored as
/// whole naira.
pub const NAIRA: &str = "₦";

/// Format an amount with thousands separators, e.g. `₦35,000`.
pub fn format_amount(amount: u64) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + NAIRA.len());
    out.push_str(NAIRA);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
