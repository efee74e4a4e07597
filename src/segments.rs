//! SMS segment estimation.

/// Characters that fit the GSM 03.38 7-bit default alphabet.
const GSM7_ALPHABET: &str = "@£$¥èéùìòÇØøÅåΔ_ΦΓΛΩΠΨΣΘΞÆæßÉ !\"#¤%&'()*+,-./0123456789:;<=>?¡ABCDEFGHIJKLMNOPQRSTUVWXYZÄÖÑÜ§¿abcdefghijklmnopqrstuvwxyzäöñüà\n\r\t";

const GSM7_SEGMENT_CHARS: usize = 160;
const UCS2_SEGMENT_CHARS: usize = 70;

/// Character set a message will be transmitted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    Gsm7,
    Ucs2,
}

impl Encoding {
    /// Characters carried by one segment in this encoding.
    pub fn segment_chars(self) -> usize {
        match self {
            Self::Gsm7 => GSM7_SEGMENT_CHARS,
            Self::Ucs2 => UCS2_SEGMENT_CHARS,
        }
    }
}

/// `Gsm7` when every character is in the GSM alphabet, `Ucs2` otherwise.
pub fn encoding(message: &str) -> Encoding {
    if message.chars().all(|c| GSM7_ALPHABET.contains(c)) {
        Encoding::Gsm7
    } else {
        Encoding::Ucs2
    }
}

/// Number of transport segments `message` will be billed as. Empty messages use none.
pub fn segment_count(message: &str) -> usize {
    let length = message.chars().count();
    if length == 0 {
        return 0;
    }
    length.div_ceil(encoding(message).segment_chars())
}
