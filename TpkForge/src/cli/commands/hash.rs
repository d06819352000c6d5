//! Print TPK name hashes

use crate::utils::tpk_hash;

pub fn execute(values: &[String]) {
    for value in values {
        println!("{:08X}  {value}", tpk_hash(value));
    }
}
